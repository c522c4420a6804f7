use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    /// 视频无法打开，或元数据不可用（帧率为 0、缺少时长）
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// 单帧解码失败，由采样器/提取器就地吸收
    #[error("Frame decode failed: {0}")]
    Decode(String),
    /// 单帧文字识别失败，由页数检测器就地吸收
    #[error("Text recognition failed: {0}")]
    Recognition(String),
    #[error("Required tool not found: {0}")]
    ToolMissing(String),
    #[error("No page images to assemble")]
    EmptyDocument,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] json5::Error),
}

impl SheetError {
    /// Run-aborting errors; everything else is absorbed per frame or per page.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SheetError::Decode(_) | SheetError::Recognition(_))
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
