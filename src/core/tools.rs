//! 外部工具检测（ffmpeg / ffprobe / tesseract），每个进程只探测一次

use crate::core::error::{Result, SheetError};
use log::{debug, error};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::Mutex;

static AVAILABILITY: Lazy<Mutex<HashMap<String, bool>>> = Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    Tesseract,
}

impl Tool {
    pub fn default_program(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::Tesseract => "tesseract",
        }
    }

    fn version_flag(&self) -> &'static str {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => "-version",
            Tool::Tesseract => "--version",
        }
    }
}

fn probe(program: &str, flag: &str) -> bool {
    Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn is_available(tool: Tool, program: &str) -> bool {
    let key = format!("{}:{}", program, tool.version_flag());
    if let Ok(cache) = AVAILABILITY.lock() {
        if let Some(&known) = cache.get(&key) {
            return known;
        }
    }

    let found = probe(program, tool.version_flag());
    debug!("Tool {} available: {}", program, found);

    if let Ok(mut cache) = AVAILABILITY.lock() {
        cache.insert(key, found);
    }
    found
}

/// Fails with `ToolMissing` naming the first program that does not run.
pub fn ensure_available(requirements: &[(Tool, &str)]) -> Result<()> {
    for &(tool, program) in requirements {
        if !is_available(tool, program) {
            error!("❌ {} is not installed or not runnable", program);
            return Err(SheetError::ToolMissing(program.to_string()));
        }
    }
    Ok(())
}
