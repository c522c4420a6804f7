//! 乐谱页提取流水线：采样 -> 页数检测 -> 分段规划 -> 提取增强 -> 落盘
//!
//! 各阶段严格串行：分段规划依赖页数检测的完整结果。

use super::detector::{PageCountDetector, PageTally};
use super::extractor::{PageExtractor, PageImage};
use super::planner::{plan_segments, SegmentPlan};
use super::storage::PageStore;
use crate::core::config::PipelineConfig;
use crate::core::error::{Result, SheetError};
use crate::core::ocr::TextRecognizer;
use crate::core::video::{FrameSampler, VideoSource};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    /// Some planned pages failed to decode; indices ascending.
    PartialExtraction { missing: Vec<u32> },
    /// The scan finished without a single `current/total` annotation.
    NoPagesDetected,
}

impl RunStatus {
    pub fn name(&self) -> &'static str {
        match self {
            RunStatus::Complete => "Complete",
            RunStatus::PartialExtraction { .. } => "PartialExtraction",
            RunStatus::NoPagesDetected => "NoPagesDetected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub detection: PageTally,
    /// Candidate scan ended on a read failure before end of stream.
    pub scan_terminated_early: bool,
    pub plan: Option<SegmentPlan>,
    /// Ascending `page_index`.
    pub pages: Vec<PageImage>,
    pub page_paths: Vec<PathBuf>,
    pub status: RunStatus,
}

impl RunReport {
    pub fn planned_pages(&self) -> usize {
        self.plan.as_ref().map_or(0, SegmentPlan::len)
    }

    pub fn extracted_indices(&self) -> Vec<u32> {
        self.pages.iter().map(PageImage::page_index).collect()
    }

    pub fn missing_indices(&self) -> &[u32] {
        match &self.status {
            RunStatus::PartialExtraction { missing } => missing,
            _ => &[],
        }
    }
}

pub struct SheetPipeline {
    config: PipelineConfig,
    recognizer: Box<dyn TextRecognizer>,
}

impl SheetPipeline {
    pub fn new(config: PipelineConfig, recognizer: Box<dyn TextRecognizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, recognizer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run<V: VideoSource + ?Sized>(&self, video: &mut V, work_dir: &Path) -> Result<RunReport> {
        self.config.validate()?;

        let video_info = video.info();
        if !video_info.frame_rate.is_finite() || video_info.frame_rate <= 0.0 {
            return Err(SheetError::SourceUnavailable(format!(
                "video reports frame rate {}",
                video_info.frame_rate
            )));
        }
        let duration = video_info.duration();
        if duration <= 0.0 {
            return Err(SheetError::SourceUnavailable("video has no frames".to_string()));
        }
        let intro_length = self.config.planner.intro_length;
        if intro_length >= duration {
            return Err(SheetError::InvalidParameter(format!(
                "intro length {}s must be shorter than video duration {:.3}s",
                intro_length, duration
            )));
        }

        let store = PageStore::create(work_dir)?;

        // 1. 候选帧采样 + 页数检测
        let sampler = FrameSampler::new(self.config.sampler.clone());
        let detector = PageCountDetector::new(self.recognizer.as_ref());
        let (detection, scan_terminated_early, scan_failure) = {
            let mut candidates = sampler.sample(video)?;
            let tally = detector.detect(candidates.by_ref());
            (tally, candidates.terminated_early(), candidates.take_failure())
        };
        if let Some(err) = scan_failure {
            error!("❌ Candidate scan failed: {}", err);
            return Err(err);
        }

        if detection.no_pages() {
            warn!(
                "⚠️ No page annotations found in {} candidate frames",
                detection.frames_scanned
            );
            return Ok(RunReport {
                detection,
                scan_terminated_early,
                plan: None,
                pages: Vec::new(),
                page_paths: Vec::new(),
                status: RunStatus::NoPagesDetected,
            });
        }

        // 每页至少占一帧，超出帧数的总页数必然是误识别
        if u64::from(detection.total_pages) > video_info.frame_count {
            return Err(SheetError::InvalidParameter(format!(
                "detected {} pages but the video has only {} frames",
                detection.total_pages, video_info.frame_count
            )));
        }

        // 2. 分段规划
        let plan = plan_segments(detection.total_pages, duration, intro_length)?;
        info!(
            "🗂️ Planned {} pages, {:.2}s per segment",
            plan.len(),
            plan.segment_duration()
        );

        // 3. 提取、增强、落盘
        let extractor = PageExtractor::new(&self.config.enhance);
        let extraction = extractor.extract(video, &plan)?;
        let page_paths = store.save_all(&extraction.pages)?;

        let status = if extraction.is_complete() {
            RunStatus::Complete
        } else {
            warn!("⚠️ Missing pages: {:?}", extraction.missing);
            RunStatus::PartialExtraction {
                missing: extraction.missing,
            }
        };

        info!(
            "✅ Run finished: {} ({}/{} pages)",
            status.name(),
            extraction.pages.len(),
            plan.len()
        );

        Ok(RunReport {
            detection,
            scan_terminated_early,
            plan: Some(plan),
            pages: extraction.pages,
            page_paths,
            status,
        })
    }
}
