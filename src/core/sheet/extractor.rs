//! 页面提取与增强
//!
//! 按时间戳顺序逐页定位解码（同一视频句柄的 seek 有状态，必须串行），
//! 解码完成后并行锐化，最后按页码重新排序再交给文档合成。

use super::enhance::Sharpener;
use super::planner::SegmentPlan;
use crate::core::config::EnhanceConfig;
use crate::core::error::Result;
use crate::core::video::VideoSource;
use image::RgbImage;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::Duration;

/// 单页最终图像，创建后不可变
#[derive(Debug, Clone)]
pub struct PageImage {
    page_index: u32,
    timestamp: f64,
    image: RgbImage,
}

impl PageImage {
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Ascending `page_index`.
    pub pages: Vec<PageImage>,
    /// Planned indices that failed to decode, ascending.
    pub missing: Vec<u32>,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn page_indices(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.page_index).collect()
    }
}

pub struct PageExtractor {
    sharpener: Sharpener,
}

impl PageExtractor {
    pub fn new(config: &EnhanceConfig) -> Self {
        Self {
            sharpener: Sharpener::new(config),
        }
    }

    /// Decode failures skip the page and are reported in `missing`; only
    /// run-level errors (missing decoder, I/O) propagate.
    pub fn extract<V: VideoSource + ?Sized>(
        &self,
        video: &mut V,
        plan: &SegmentPlan,
    ) -> Result<ExtractionReport> {
        let mut entries = plan.entries().to_vec();
        entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let mut decoded = Vec::with_capacity(entries.len());
        let mut missing = Vec::new();

        for entry in &entries {
            let at = Duration::from_secs_f64(entry.timestamp);
            match video.frame_at(at) {
                Ok(frame) => match frame.into_rgb_image() {
                    Some(image) => {
                        debug!("Page {} decoded at {:.3}s", entry.page_index, entry.timestamp);
                        decoded.push((entry.page_index, entry.timestamp, image));
                    }
                    None => {
                        warn!(
                            "⚠️ Page {} at {:.3}s: truncated frame, skipped",
                            entry.page_index, entry.timestamp
                        );
                        missing.push(entry.page_index);
                    }
                },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        "⚠️ Page {} at {:.3}s skipped: {}",
                        entry.page_index, entry.timestamp, e
                    );
                    missing.push(entry.page_index);
                }
            }
        }

        let mut pages = self.enhance_all(decoded);
        pages.sort_by_key(|p| p.page_index);
        missing.sort_unstable();

        info!("🖼️ Extracted {}/{} pages", pages.len(), plan.len());

        Ok(ExtractionReport { pages, missing })
    }

    fn enhance_all(&self, decoded: Vec<(u32, f64, RgbImage)>) -> Vec<PageImage> {
        let sharpener = &self.sharpener;
        let enhance = move || {
            decoded
                .into_par_iter()
                .map(|(page_index, timestamp, image)| PageImage {
                    page_index,
                    timestamp,
                    image: sharpener.apply(&image),
                })
                .collect::<Vec<_>>()
        };

        let threads = num_cpus::get().min(4);
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(enhance),
            Err(e) => {
                warn!("Falling back to global thread pool: {}", e);
                enhance()
            }
        }
    }
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new(&EnhanceConfig::default())
    }
}
