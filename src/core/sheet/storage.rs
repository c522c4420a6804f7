//! 工作目录中的页面图像存储。目录由调用方负责清理

use super::extractor::PageImage;
use crate::core::error::Result;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    /// Creates the directory if it does not exist yet and removes
    /// `page_NNN.png` files left by an earlier run. Other files are kept.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let store = Self {
            dir: dir.to_path_buf(),
        };
        store.clear_stale_pages()?;
        Ok(store)
    }

    fn clear_stale_pages(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_page = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(Self::is_page_file_name);
            if is_page && path.is_file() {
                debug!("Removing stale page {}", path.display());
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// `page_` + digits + `.png`
    fn is_page_file_name(name: &str) -> bool {
        name.strip_prefix("page_")
            .and_then(|rest| rest.strip_suffix(".png"))
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, page_index: u32) -> PathBuf {
        self.dir.join(format!("page_{:03}.png", page_index))
    }

    pub fn save(&self, page: &PageImage) -> Result<PathBuf> {
        let path = self.path_for(page.page_index());
        page.image().save(&path)?;
        debug!("Saved page {} to {}", page.page_index(), path.display());
        Ok(path)
    }

    /// Writes pages in the given order and returns their paths.
    pub fn save_all(&self, pages: &[PageImage]) -> Result<Vec<PathBuf>> {
        pages.iter().map(|p| self.save(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sheet::extractor::PageExtractor;
    use crate::core::sheet::planner::plan_segments;
    use crate::core::video::testing::SyntheticVideo;

    #[test]
    fn test_save_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::create(&dir.path().join("pages")).unwrap();

        let mut video = SyntheticVideo::new(25.0, 10.0, 5.0, 2);
        let plan = plan_segments(2, 25.0, 5.0).unwrap();
        let report = PageExtractor::default().extract(&mut video, &plan).unwrap();

        let paths = store.save_all(&report.pages).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("page_001.png"));
        assert!(paths[1].ends_with("page_002.png"));
        for path in &paths {
            let img = image::open(path).unwrap();
            assert_eq!(img.width(), 8);
        }
    }

    #[test]
    fn test_create_removes_pages_from_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page_004.png"), b"old").unwrap();
        fs::write(dir.path().join("page_1000.png"), b"old").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();
        fs::write(dir.path().join("page_cover.png"), b"keep").unwrap();

        PageStore::create(dir.path()).unwrap();

        assert!(!dir.path().join("page_004.png").exists());
        assert!(!dir.path().join("page_1000.png").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("page_cover.png").exists());
    }

    #[test]
    fn test_page_file_name_matching() {
        assert!(PageStore::is_page_file_name("page_001.png"));
        assert!(!PageStore::is_page_file_name("page_.png"));
        assert!(!PageStore::is_page_file_name("page_001.jpg"));
        assert!(!PageStore::is_page_file_name("cover.png"));
    }

    #[test]
    fn test_page_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::create(dir.path()).unwrap();
        assert!(store.path_for(12).ends_with("page_012.png"));
        assert_eq!(store.dir(), dir.path());
    }
}
