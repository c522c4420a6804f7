//! 页数检测器 - 在候选帧中识别 "当前页/总页数" 标注
//!
//! 取所有帧中出现过的最大 total 作为总页数。若识别出比真实值更大的
//! 错误数字，结果会偏大；这是该启发式的已知局限，不做修正。
//! 流水线只拒绝超过视频总帧数的页数（例如误识别出的 `1/4000000000`）。

use crate::core::ocr::TextRecognizer;
use crate::core::video::CandidateFrame;
use log::{debug, info, warn};

/// A parsed `current/total` annotation. Only `total` matters downstream;
/// `current` is kept when it happens to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAnnotation {
    pub current: Option<u32>,
    pub total: u32,
}

/// 解析一行文字。恰好一个 `/` 且斜杠后为整数时才接受
pub fn parse_page_annotation(line: &str) -> Option<PageAnnotation> {
    if line.matches('/').count() != 1 {
        return None;
    }
    let (before, after) = line.split_once('/')?;
    let total = after.trim().parse::<u32>().ok()?;
    Some(PageAnnotation {
        current: before.trim().parse::<u32>().ok(),
        total,
    })
}

/// 扫描累加器：单调不减的最大页数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    pub total_pages: u32,
    pub frames_scanned: u64,
    pub frames_failed: u64,
    pub annotations_seen: u64,
}

impl PageTally {
    pub fn observe(mut self, annotation: PageAnnotation) -> Self {
        self.annotations_seen += 1;
        self.total_pages = self.total_pages.max(annotation.total);
        self
    }

    pub fn no_pages(&self) -> bool {
        self.total_pages == 0
    }
}

pub struct PageCountDetector<'a> {
    recognizer: &'a dyn TextRecognizer,
}

impl<'a> PageCountDetector<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer) -> Self {
        Self { recognizer }
    }

    /// Folds one candidate frame into the tally. Recognition failures are
    /// counted and skipped.
    pub fn scan_frame(&self, tally: PageTally, candidate: &CandidateFrame) -> PageTally {
        let mut tally = PageTally {
            frames_scanned: tally.frames_scanned + 1,
            ..tally
        };

        let gray = candidate.frame.to_gray();
        match self.recognizer.recognize(&gray) {
            Ok(lines) => {
                for annotation in lines.iter().filter_map(|l| parse_page_annotation(l)) {
                    debug!(
                        "Page annotation {:?}/{} at {:.2}s",
                        annotation.current,
                        annotation.total,
                        candidate.timestamp().as_secs_f64()
                    );
                    tally = tally.observe(annotation);
                }
            }
            Err(e) => {
                warn!(
                    "⚠️ Recognition failed at {:.2}s: {}",
                    candidate.timestamp().as_secs_f64(),
                    e
                );
                tally.frames_failed += 1;
            }
        }
        tally
    }

    pub fn detect<I>(&self, candidates: I) -> PageTally
    where
        I: IntoIterator<Item = CandidateFrame>,
    {
        let tally = candidates
            .into_iter()
            .fold(PageTally::default(), |tally, candidate| {
                self.scan_frame(tally, &candidate)
            });

        info!(
            "📄 Page count scan: {} pages ({} frames, {} failed, {} annotations)",
            tally.total_pages, tally.frames_scanned, tally.frames_failed, tally.annotations_seen
        );
        tally
    }
}
