//! 分段规划器 - 纯函数，不做任何 I/O
//!
//! 假设片头之后每页显示时长相等、首尾相接，每页取所在分段的中点。

use crate::core::error::{Result, SheetError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannedPage {
    /// 1-based
    pub page_index: u32,
    /// Seconds from the start of the video.
    pub timestamp: f64,
}

/// Entries are strictly increasing in timestamp, indices run 1..=total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPlan {
    entries: Vec<PlannedPage>,
    segment_duration: f64,
}

impl SegmentPlan {
    pub fn entries(&self) -> &[PlannedPage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn segment_duration(&self) -> f64 {
        self.segment_duration
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.timestamp).collect()
    }
}

pub fn plan_segments(total_pages: u32, video_duration: f64, intro_length: f64) -> Result<SegmentPlan> {
    if total_pages == 0 {
        return Err(SheetError::InvalidParameter(
            "cannot plan segments for zero pages".to_string(),
        ));
    }
    if !video_duration.is_finite() || video_duration <= 0.0 {
        return Err(SheetError::InvalidParameter(format!(
            "video duration must be > 0, got {}",
            video_duration
        )));
    }
    if !intro_length.is_finite() || intro_length < 0.0 {
        return Err(SheetError::InvalidParameter(format!(
            "intro length must be >= 0, got {}",
            intro_length
        )));
    }
    if intro_length >= video_duration {
        return Err(SheetError::InvalidParameter(format!(
            "intro length {}s must be shorter than video duration {}s",
            intro_length, video_duration
        )));
    }

    let segment_duration = (video_duration - intro_length) / total_pages as f64;
    let entries = (0..total_pages)
        .map(|i| PlannedPage {
            page_index: i + 1,
            timestamp: intro_length + segment_duration * i as f64 + segment_duration / 2.0,
        })
        .collect();

    Ok(SegmentPlan {
        entries,
        segment_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_three_pages_after_five_second_intro() {
        let plan = plan_segments(3, 65.0, 5.0).unwrap();
        assert_eq!(plan.len(), 3);
        assert_close(plan.segment_duration(), 20.0);

        let ts = plan.timestamps();
        assert_close(ts[0], 15.0);
        assert_close(ts[1], 35.0);
        assert_close(ts[2], 55.0);

        let indices: Vec<u32> = plan.entries().iter().map(|e| e.page_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_plan_properties_hold_across_inputs() {
        let durations = [0.5, 7.0, 65.0, 183.25, 3600.0];
        let intros = [0.0, 0.25, 5.0, 30.0];
        for &duration in &durations {
            for &intro in &intros {
                if intro >= duration {
                    continue;
                }
                for pages in [1u32, 2, 3, 7, 64, 500] {
                    let plan = plan_segments(pages, duration, intro).unwrap();
                    assert_eq!(plan.len(), pages as usize);

                    for (i, entry) in plan.entries().iter().enumerate() {
                        assert_eq!(entry.page_index, i as u32 + 1);
                        assert!(entry.timestamp >= intro && entry.timestamp <= duration);
                    }
                    assert!(plan
                        .entries()
                        .windows(2)
                        .all(|w| w[0].timestamp < w[1].timestamp));
                }
            }
        }
    }

    #[test]
    fn test_plan_is_idempotent() {
        let a = plan_segments(4, 120.0, 5.0).unwrap();
        let b = plan_segments(4, 120.0, 5.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_intro_accepted() {
        let plan = plan_segments(2, 10.0, 0.0).unwrap();
        assert_close(plan.timestamps()[0], 2.5);
        assert_close(plan.timestamps()[1], 7.5);
    }

    #[test]
    fn test_zero_pages_rejected() {
        assert!(matches!(
            plan_segments(0, 65.0, 5.0),
            Err(SheetError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_intro_equal_or_longer_than_video_rejected() {
        assert!(matches!(
            plan_segments(3, 5.0, 5.0),
            Err(SheetError::InvalidParameter(_))
        ));
        assert!(matches!(
            plan_segments(3, 5.0, 9.0),
            Err(SheetError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_negative_or_nan_inputs_rejected() {
        assert!(plan_segments(3, 65.0, -1.0).is_err());
        assert!(plan_segments(3, f64::NAN, 0.0).is_err());
        assert!(plan_segments(3, 65.0, f64::NAN).is_err());
    }
}
