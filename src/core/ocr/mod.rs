//! 文字识别接口 - 灰度图 -> 文本行序列

pub mod tesseract;

pub use tesseract::TesseractRecognizer;

use crate::core::error::Result;
use image::GrayImage;

pub trait TextRecognizer: Send + Sync {
    /// Recognizes one grayscale raster and returns its text lines in reading order.
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>>;
}

/// 测试用识别器：根据图像内容返回预设文本
pub struct MockTextRecognizer {
    pattern: Option<Box<dyn Fn(&GrayImage) -> Result<Vec<String>> + Send + Sync>>,
}

impl MockTextRecognizer {
    pub fn new() -> Self {
        Self { pattern: None }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&GrayImage) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        Self {
            pattern: Some(Box::new(pattern)),
        }
    }

    /// Returns the same lines for every image.
    pub fn with_fixed_lines(lines: Vec<String>) -> Self {
        Self::with_pattern(move |_| Ok(lines.clone()))
    }
}

impl Default for MockTextRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for MockTextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>> {
        match &self.pattern {
            Some(p) => p(image),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SheetError;

    #[test]
    fn test_mock_recognizer_default_is_empty() {
        let recognizer = MockTextRecognizer::new();
        let lines = recognizer.recognize(&GrayImage::new(4, 4)).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_mock_recognizer_with_pattern() {
        let recognizer = MockTextRecognizer::with_pattern(|img| {
            if img.get_pixel(0, 0)[0] > 100 {
                Ok(vec!["2/4".to_string()])
            } else {
                Err(SheetError::Recognition("blank".to_string()))
            }
        });

        let bright = GrayImage::from_pixel(4, 4, image::Luma([200]));
        assert_eq!(recognizer.recognize(&bright).unwrap(), vec!["2/4"]);

        let dark = GrayImage::new(4, 4);
        assert!(recognizer.recognize(&dark).is_err());
    }

    #[test]
    fn test_mock_recognizer_fixed_lines() {
        let recognizer = MockTextRecognizer::with_fixed_lines(vec!["Drums".into(), "1/2".into()]);
        assert_eq!(recognizer.recognize(&GrayImage::new(1, 1)).unwrap().len(), 2);
    }
}
