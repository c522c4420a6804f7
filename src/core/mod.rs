pub mod config;
pub mod document;
pub mod error;
pub mod ocr;
pub mod sheet;
pub mod tools;
pub mod video;

pub use config::PipelineConfig;
pub use error::SheetError;
