//! Tesseract 子进程识别器

use super::TextRecognizer;
use crate::core::config::OcrConfig;
use crate::core::error::{Result, SheetError};
use image::{GrayImage, ImageOutputFormat};
use log::debug;
use std::io::{Cursor, ErrorKind, Write};
use std::process::{Command, Stdio};

pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// 按行拆分识别结果，去掉空行
    pub(crate) fn split_lines(stdout: &str) -> Vec<String> {
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(OcrConfig::default())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>> {
        let png = Self::encode_png(image)?;
        let psm = self.config.page_segmentation_mode.to_string();

        let mut child = Command::new(&self.config.tesseract_path)
            .args(["stdin", "stdout", "--psm", psm.as_str(), "-l", self.config.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SheetError::ToolMissing(self.config.tesseract_path.clone()),
                _ => SheetError::Recognition(format!("failed to spawn tesseract: {}", e)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| SheetError::Recognition(format!("failed to feed image: {}", e)))?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SheetError::Recognition(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let lines = Self::split_lines(&String::from_utf8_lossy(&output.stdout));
        debug!("Tesseract recognized {} lines", lines.len());
        Ok(lines)
    }
}
