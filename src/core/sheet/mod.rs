//! 乐谱分页核心：页数检测、分段规划、页面提取与增强

pub mod detector;
pub mod enhance;
pub mod extractor;
pub mod pipeline;
pub mod planner;
pub mod storage;

pub use detector::{parse_page_annotation, PageAnnotation, PageCountDetector, PageTally};
pub use enhance::Sharpener;
pub use extractor::{ExtractionReport, PageExtractor, PageImage};
pub use pipeline::{RunReport, RunStatus, SheetPipeline};
pub use planner::{plan_segments, PlannedPage, SegmentPlan};
pub use storage::PageStore;
