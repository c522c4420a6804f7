//! 候选帧采样器 - 按固定步长从源视频中抽帧，仅用于页数发现

use super::frame::CandidateFrame;
use super::VideoSource;
use crate::core::config::SamplerConfig;
use crate::core::error::{Result, SheetError};
use log::{debug, warn};

pub struct FrameSampler {
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// `floor(source_rate / output_rate)`, validated against both rates.
    pub fn stride_for(source_rate: f64, output_rate: f64) -> Result<u64> {
        if !source_rate.is_finite() || source_rate <= 0.0 {
            return Err(SheetError::SourceUnavailable(format!(
                "video reports frame rate {}",
                source_rate
            )));
        }
        if !output_rate.is_finite() || output_rate <= 0.0 || output_rate > source_rate {
            return Err(SheetError::InvalidParameter(format!(
                "sampling rate must be in (0, {}], got {}",
                source_rate, output_rate
            )));
        }

        Ok(((source_rate / output_rate).floor() as u64).max(1))
    }

    /// 返回惰性、有限、有序的候选帧序列
    pub fn sample<'a, V: VideoSource + ?Sized>(
        &self,
        video: &'a mut V,
    ) -> Result<CandidateFrames<'a, V>> {
        let info = video.info();
        let stride = Self::stride_for(info.frame_rate, self.config.output_rate)?;
        video.rewind()?;

        debug!(
            "Sampling {} frames at {:.2}fps with stride {}",
            info.frame_count, info.frame_rate, stride
        );

        Ok(CandidateFrames {
            video,
            stride,
            index: 0,
            finished: false,
            terminated_early: false,
            failure: None,
        })
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

/// Frames whose index is a multiple of the stride. A failed read ends the
/// sequence instead of raising; fatal errors and a failure on the very first
/// frame are kept for [`CandidateFrames::take_failure`].
pub struct CandidateFrames<'a, V: VideoSource + ?Sized> {
    video: &'a mut V,
    stride: u64,
    index: u64,
    finished: bool,
    terminated_early: bool,
    failure: Option<SheetError>,
}

impl<V: VideoSource + ?Sized> CandidateFrames<'_, V> {
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Source frames consumed so far, sampled or skipped.
    pub fn frames_read(&self) -> u64 {
        self.index
    }

    pub fn terminated_early(&self) -> bool {
        self.terminated_early
    }

    /// The error that makes the scan unusable: a fatal one, or any error
    /// before a single frame was read.
    pub fn take_failure(&mut self) -> Option<SheetError> {
        self.failure.take()
    }

    fn stop_on_error(&mut self, err: SheetError) {
        warn!("⚠️ Candidate scan stopped at frame {}: {}", self.index, err);
        self.finished = true;
        self.terminated_early = true;

        if err.is_fatal() {
            self.failure = Some(err);
        } else if self.index == 0 {
            self.failure = Some(SheetError::SourceUnavailable(format!(
                "no frame could be decoded: {}",
                err
            )));
        }
    }
}

impl<V: VideoSource + ?Sized> Iterator for CandidateFrames<'_, V> {
    type Item = CandidateFrame;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if self.index % self.stride == 0 {
                match self.video.next_frame() {
                    Ok(Some(frame)) => {
                        self.index += 1;
                        return Some(CandidateFrame { frame });
                    }
                    Ok(None) => self.finished = true,
                    Err(e) => self.stop_on_error(e),
                }
            } else {
                match self.video.skip_frame() {
                    Ok(true) => self.index += 1,
                    Ok(false) => self.finished = true,
                    Err(e) => self.stop_on_error(e),
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::testing::SyntheticVideo;
    use crate::core::video::{Frame, VideoInfo};
    use std::time::Duration;

    fn sampler(rate: f64) -> FrameSampler {
        FrameSampler::new(SamplerConfig { output_rate: rate })
    }

    #[test]
    fn test_stride_calculation() {
        assert_eq!(FrameSampler::stride_for(30.0, 1.0).unwrap(), 30);
        assert_eq!(FrameSampler::stride_for(29.97, 1.0).unwrap(), 29);
        assert_eq!(FrameSampler::stride_for(30.0, 30.0).unwrap(), 1);
        assert_eq!(FrameSampler::stride_for(25.0, 2.0).unwrap(), 12);
    }

    #[test]
    fn test_invalid_output_rate() {
        assert!(matches!(
            FrameSampler::stride_for(30.0, 0.0),
            Err(SheetError::InvalidParameter(_))
        ));
        assert!(matches!(
            FrameSampler::stride_for(30.0, -2.0),
            Err(SheetError::InvalidParameter(_))
        ));
        assert!(matches!(
            FrameSampler::stride_for(30.0, 31.0),
            Err(SheetError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_frame_rate_is_source_unavailable() {
        assert!(matches!(
            FrameSampler::stride_for(0.0, 1.0),
            Err(SheetError::SourceUnavailable(_))
        ));

        let mut video = SyntheticVideo::new(10.0, 10.0, 0.0, 1);
        video.info.frame_rate = 0.0;
        assert!(matches!(
            sampler(1.0).sample(&mut video),
            Err(SheetError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_samples_every_stride_frame() {
        let mut video = SyntheticVideo::new(10.0, 10.0, 0.0, 1);
        let frames: Vec<_> = sampler(2.0).sample(&mut video).unwrap().collect();

        assert_eq!(frames.len(), 20);
        let numbers: Vec<u64> = frames.iter().map(|c| c.frame.frame_number).collect();
        assert!(numbers.iter().all(|n| n % 5 == 0));
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_mid_stream_failure_ends_sequence() {
        let mut video = SyntheticVideo::new(10.0, 10.0, 0.0, 1);
        video.fail_after_frame = Some(35);

        let mut candidates = sampler(1.0).sample(&mut video).unwrap();
        let frames: Vec<_> = candidates.by_ref().collect();

        // frames 0, 10, 20, 30 decoded before the corrupt region
        assert_eq!(frames.len(), 4);
        assert!(candidates.terminated_early());
        assert_eq!(candidates.frames_read(), 35);
        // 已读出部分帧，错误被吸收
        assert!(candidates.take_failure().is_none());
    }

    #[test]
    fn test_failure_on_first_frame_is_source_unavailable() {
        let mut video = SyntheticVideo::new(10.0, 10.0, 0.0, 1);
        video.fail_after_frame = Some(0);

        let mut candidates = sampler(1.0).sample(&mut video).unwrap();
        assert_eq!(candidates.by_ref().count(), 0);
        assert!(candidates.terminated_early());
        assert!(matches!(
            candidates.take_failure(),
            Some(SheetError::SourceUnavailable(_))
        ));
    }

    struct MissingDecoder;

    impl VideoSource for MissingDecoder {
        fn info(&self) -> VideoInfo {
            VideoInfo {
                width: 2,
                height: 2,
                frame_rate: 30.0,
                frame_count: 1950,
            }
        }

        fn rewind(&mut self) -> Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Err(SheetError::ToolMissing("ffmpeg".to_string()))
        }

        fn frame_at(&mut self, _timestamp: Duration) -> Result<Frame> {
            Err(SheetError::ToolMissing("ffmpeg".to_string()))
        }
    }

    #[test]
    fn test_fatal_error_is_kept() {
        let mut video = MissingDecoder;
        let mut candidates = sampler(1.0).sample(&mut video).unwrap();
        assert_eq!(candidates.by_ref().count(), 0);
        assert!(matches!(
            candidates.take_failure(),
            Some(SheetError::ToolMissing(_))
        ));
        // 只取一次
        assert!(candidates.take_failure().is_none());
    }

    #[test]
    fn test_sampling_restarts_from_beginning() {
        let mut video = SyntheticVideo::new(4.0, 10.0, 0.0, 1);
        let first = sampler(1.0).sample(&mut video).unwrap().count();
        let second = sampler(1.0).sample(&mut video).unwrap().count();
        assert_eq!(first, 4);
        assert_eq!(first, second);
    }
}
