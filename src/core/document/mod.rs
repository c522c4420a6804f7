//! 文档合成 - 把有序的页面图像合并为单个多页文档

pub mod pdf;

pub use pdf::PdfAssembler;

use crate::core::error::Result;
use crate::core::sheet::PageImage;
use std::path::Path;

pub trait DocumentAssembler {
    /// Writes `pages` in the given order to `dest`, one page per image.
    fn assemble(&self, pages: &[PageImage], dest: &Path) -> Result<()>;
}
