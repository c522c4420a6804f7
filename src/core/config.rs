//! 流水线配置 - 各组件显式传入，不依赖模块级常量

use crate::core::error::{Result, SheetError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 3x3 锐化卷积核：中心 5，上下左右 -1，四角 0
pub const DEFAULT_SHARPEN_KERNEL: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// 输出采样率（每秒帧数），不是源视频帧率
    pub output_rate: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { output_rate: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// 片头长度（秒），该区间不参与分页
    pub intro_length: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { intro_length: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub kernel: [[i32; 3]; 3],
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            kernel: DEFAULT_SHARPEN_KERNEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub jpeg_quality: u8,
    pub dpi: f64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            dpi: 72.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_path: String,
    pub language: String,
    /// Tesseract `--psm`; 6 assumes a single uniform block of text.
    pub page_segmentation_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampler: SamplerConfig,
    pub planner: PlannerConfig,
    pub enhance: EnhanceConfig,
    pub document: DocumentConfig,
    pub ocr: OcrConfig,
}

impl PipelineConfig {
    /// 片头较长的教学视频（品牌动画 + 讲解）
    pub fn long_intro() -> Self {
        Self {
            planner: PlannerConfig { intro_length: 10.0 },
            ..Default::default()
        }
    }

    /// 翻页较快的视频，提高候选帧采样密度
    pub fn dense_scan() -> Self {
        Self {
            sampler: SamplerConfig { output_rate: 2.0 },
            ..Default::default()
        }
    }

    pub fn from_json5_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = json5::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    /// Checks every constraint that does not depend on the video itself.
    pub fn validate(&self) -> Result<()> {
        let rate = self.sampler.output_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SheetError::InvalidParameter(format!(
                "sampling rate must be > 0, got {}",
                rate
            )));
        }

        let intro = self.planner.intro_length;
        if !intro.is_finite() || intro < 0.0 {
            return Err(SheetError::InvalidParameter(format!(
                "intro length must be >= 0, got {}",
                intro
            )));
        }

        if self.document.jpeg_quality == 0 || self.document.jpeg_quality > 100 {
            return Err(SheetError::InvalidParameter(format!(
                "jpeg quality must be in 1..=100, got {}",
                self.document.jpeg_quality
            )));
        }

        if !self.document.dpi.is_finite() || self.document.dpi <= 0.0 {
            return Err(SheetError::InvalidParameter(format!(
                "document dpi must be > 0, got {}",
                self.document.dpi
            )));
        }

        Ok(())
    }
}
