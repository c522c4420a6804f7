pub mod sheet;

pub use sheet::{ProcessSummary, SheetApiError, SheetMusicExtractor};
