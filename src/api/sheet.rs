//! 乐谱视频 -> 页面图像 + PDF

use crate::core::config::PipelineConfig;
use crate::core::document::{DocumentAssembler, PdfAssembler};
use crate::core::error::SheetError;
use crate::core::ocr::{TesseractRecognizer, TextRecognizer};
use crate::core::sheet::{RunReport, SheetPipeline};
use crate::core::tools::{self, Tool};
use crate::core::video::FfmpegVideo;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetApiError {
    pub error_type: String,
    pub message: String,
}

impl SheetApiError {
    fn new(error_type: &str, message: String) -> Self {
        Self {
            error_type: error_type.to_string(),
            message,
        }
    }
}

impl From<SheetError> for SheetApiError {
    fn from(err: SheetError) -> Self {
        let error_type = match &err {
            SheetError::SourceUnavailable(_) => "SourceUnavailable",
            SheetError::InvalidParameter(_) => "InvalidParameter",
            SheetError::Decode(_) => "DecodeError",
            SheetError::Recognition(_) => "RecognitionError",
            SheetError::ToolMissing(_) => "ToolMissing",
            SheetError::EmptyDocument => "EmptyDocument",
            SheetError::Io(_) => "IoError",
            SheetError::Image(_) => "ImageError",
            SheetError::Pdf(_) => "PdfError",
            SheetError::Json(_) => "JsonError",
            SheetError::Config(_) => "ConfigError",
        };
        Self::new(error_type, err.to_string())
    }
}

impl std::fmt::Display for SheetApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for SheetApiError {}

/// 一次处理的结果摘要，可直接序列化给宿主 UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSummary {
    /// `Complete` / `PartialExtraction` / `NoPagesDetected`
    pub status: String,
    pub total_pages: u32,
    pub extracted_pages: Vec<u32>,
    pub missing_pages: Vec<u32>,
    pub page_paths: Vec<String>,
    /// 没有任何页面时不生成 PDF
    pub pdf_path: Option<String>,
}

impl ProcessSummary {
    fn from_report(report: &RunReport, pdf_path: Option<&Path>) -> Self {
        Self {
            status: report.status.name().to_string(),
            total_pages: report.detection.total_pages,
            extracted_pages: report.extracted_indices(),
            missing_pages: report.missing_indices().to_vec(),
            page_paths: report
                .page_paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            pdf_path: pdf_path.map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

/// 乐谱提取器
///
/// ```ignore
/// let extractor = SheetMusicExtractor::create(PipelineConfig::default())?;
/// let summary = extractor.process_video(
///     Path::new("lesson.mp4"),
///     Path::new("work"),
///     Path::new("sheet_music_pages.pdf"),
/// )?;
/// println!("{} -> {:?}", summary.status, summary.pdf_path);
/// ```
pub struct SheetMusicExtractor {
    pipeline: SheetPipeline,
    assembler: PdfAssembler,
    /// 默认识别器依赖 tesseract 可执行文件
    tesseract: Option<String>,
}

impl SheetMusicExtractor {
    /// 使用 tesseract 识别页码
    pub fn create(config: PipelineConfig) -> Result<Self, SheetApiError> {
        let tesseract = config.ocr.tesseract_path.clone();
        let recognizer = Box::new(TesseractRecognizer::new(config.ocr.clone()));
        let mut extractor = Self::with_recognizer(config, recognizer)?;
        extractor.tesseract = Some(tesseract);
        Ok(extractor)
    }

    pub fn with_recognizer(
        config: PipelineConfig,
        recognizer: Box<dyn TextRecognizer>,
    ) -> Result<Self, SheetApiError> {
        let assembler = PdfAssembler::new(config.document.clone());
        let pipeline = SheetPipeline::new(config, recognizer)?;
        info!("🎼 SheetMusicExtractor: created");
        Ok(Self {
            pipeline,
            assembler,
            tesseract: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    /// 处理单个视频：页面图像写入 `work_dir`，合成的 PDF 写入 `output_pdf`
    pub fn process_video(
        &self,
        video_path: &Path,
        work_dir: &Path,
        output_pdf: &Path,
    ) -> Result<ProcessSummary, SheetApiError> {
        if !video_path.is_file() {
            return Err(SheetError::SourceUnavailable(format!(
                "{} does not exist",
                video_path.display()
            ))
            .into());
        }
        self.ensure_tools()?;

        let mut video = FfmpegVideo::open(video_path)?;
        let report = self.pipeline.run(&mut video, work_dir)?;

        let pdf_path = if report.pages.is_empty() {
            None
        } else {
            self.assembler.assemble(&report.pages, output_pdf)?;
            Some(output_pdf)
        };

        Ok(ProcessSummary::from_report(&report, pdf_path))
    }

    fn ensure_tools(&self) -> Result<(), SheetError> {
        let mut required = vec![
            (Tool::Ffmpeg, Tool::Ffmpeg.default_program()),
            (Tool::Ffprobe, Tool::Ffprobe.default_program()),
        ];
        if let Some(tesseract) = &self.tesseract {
            required.push((Tool::Tesseract, tesseract.as_str()));
        }
        tools::ensure_available(&required)
    }
}

impl Drop for SheetMusicExtractor {
    fn drop(&mut self) {
        info!("🗑️ SheetMusicExtractor: released");
    }
}
