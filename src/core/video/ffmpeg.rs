//! 基于 ffmpeg/ffprobe 子进程的视频源

use super::frame::Frame;
use super::{VideoInfo, VideoSource};
use crate::core::error::{Result, SheetError};
use log::{debug, info, warn};
use serde::Deserialize;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// 顺序解码用的 ffmpeg 子进程（rawvideo rgb24 输出到 stdout）
struct FrameStream {
    child: Child,
    stdout: ChildStdout,
}

impl FrameStream {
    fn close(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// stdout 已读到 EOF，等待子进程退出并取回状态
    fn finish(self) -> std::io::Result<ExitStatus> {
        let FrameStream { mut child, stdout } = self;
        drop(stdout);
        child.wait()
    }
}

pub struct FfmpegVideo {
    path: PathBuf,
    ffmpeg: String,
    info: VideoInfo,
    stream: Option<FrameStream>,
    cursor: u64,
    scratch: Vec<u8>,
}

impl FfmpegVideo {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, "ffmpeg", "ffprobe")
    }

    pub fn open_with(path: &Path, ffmpeg: &str, ffprobe: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(SheetError::SourceUnavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SheetError::ToolMissing(ffprobe.to_string()),
                _ => SheetError::SourceUnavailable(format!("failed to run {}: {}", ffprobe, e)),
            })?;

        if !output.status.success() {
            return Err(SheetError::SourceUnavailable(format!(
                "{} could not read {}: {}",
                ffprobe,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let info = Self::parse_probe(&String::from_utf8_lossy(&output.stdout))?;
        info!(
            "🎬 Opened video {} ({}x{}, {:.3}fps, {} frames, {:.1}s)",
            path.display(),
            info.width,
            info.height,
            info.frame_rate,
            info.frame_count,
            info.duration()
        );

        Ok(Self {
            path: path.to_path_buf(),
            ffmpeg: ffmpeg.to_string(),
            info,
            stream: None,
            cursor: 0,
            scratch: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 解析 ffprobe 的 JSON 输出
    pub(crate) fn parse_probe(json: &str) -> Result<VideoInfo> {
        let probe: ProbeOutput = serde_json::from_str(json)?;
        let stream = probe
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| SheetError::SourceUnavailable("no video stream".to_string()))?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(SheetError::SourceUnavailable(
                    "video stream has no dimensions".to_string(),
                ))
            }
        };

        let frame_rate = stream
            .avg_frame_rate
            .as_deref()
            .and_then(Self::parse_rational)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(Self::parse_rational))
            .ok_or_else(|| SheetError::SourceUnavailable("zero or unknown frame rate".to_string()))?;

        let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
            Some(count) if count > 0 => count,
            _ => {
                let duration = stream
                    .duration
                    .as_deref()
                    .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
                    .and_then(|d| d.parse::<f64>().ok())
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .ok_or_else(|| {
                        SheetError::SourceUnavailable("missing duration".to_string())
                    })?;
                (duration * frame_rate).round() as u64
            }
        };

        Ok(VideoInfo {
            width,
            height,
            frame_rate,
            frame_count,
        })
    }

    /// "30000/1001" -> 29.97; zero or malformed rates yield `None`.
    pub(crate) fn parse_rational(text: &str) -> Option<f64> {
        let value = match text.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.trim().parse().ok()?;
                let den: f64 = den.trim().parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                num / den
            }
            None => text.trim().parse().ok()?,
        };
        (value.is_finite() && value > 0.0).then_some(value)
    }

    /// EOF 只有在 ffmpeg 正常退出且至少解出一帧时才算流结束
    pub(crate) fn check_end_of_stream(exited_ok: bool, decoded: u64, expected: u64) -> Result<()> {
        if !exited_ok {
            return Err(SheetError::Decode(format!(
                "ffmpeg failed after {} of {} frames",
                decoded, expected
            )));
        }
        if decoded == 0 && expected > 0 {
            return Err(SheetError::Decode(format!(
                "ffmpeg produced no frames, {} expected",
                expected
            )));
        }
        Ok(())
    }

    fn frame_len(&self) -> usize {
        Frame::expected_len(self.info.width, self.info.height)
    }

    fn ensure_stream(&mut self) -> Result<&mut FrameStream> {
        if self.stream.is_none() {
            debug!("Starting sequential decode of {}", self.path.display());
            let mut child = Command::new(&self.ffmpeg)
                .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
                .arg(&self.path)
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => SheetError::ToolMissing(self.ffmpeg.clone()),
                    _ => SheetError::Decode(format!("failed to spawn {}: {}", self.ffmpeg, e)),
                })?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| SheetError::Decode("ffmpeg stdout unavailable".to_string()))?;
            self.stream = Some(FrameStream { child, stdout });
        }

        self.stream
            .as_mut()
            .ok_or_else(|| SheetError::Decode("decoder stream unavailable".to_string()))
    }

    /// Fills `scratch` with the next raw frame. `Ok(false)` on clean end of stream.
    fn read_raw(&mut self) -> Result<bool> {
        let len = self.frame_len();
        let mut buf = std::mem::take(&mut self.scratch);
        buf.resize(len, 0);

        let read = {
            let stream = self.ensure_stream()?;
            read_full(&mut stream.stdout, &mut buf)?
        };
        self.scratch = buf;

        if read == 0 {
            if let Some(stream) = self.stream.take() {
                let status = stream.finish()?;
                Self::check_end_of_stream(status.success(), self.cursor, self.info.frame_count)?;
            }
            return Ok(false);
        }
        if read < len {
            return Err(SheetError::Decode(format!(
                "short read at frame {}: {} of {} bytes",
                self.cursor, read, len
            )));
        }

        self.cursor += 1;
        Ok(true)
    }
}

impl VideoSource for FfmpegVideo {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn rewind(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.read_raw()? {
            return Ok(None);
        }
        let number = self.cursor - 1;
        Ok(Some(Frame::new(
            self.info.width,
            self.info.height,
            self.scratch.clone(),
            self.info.timestamp_of(number),
            number,
        )))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        self.read_raw()
    }

    fn frame_at(&mut self, timestamp: Duration) -> Result<Frame> {
        let secs = timestamp.as_secs_f64();
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-noautorotate", "-ss"])
            .arg(format!("{:.3}", secs))
            .arg("-i")
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SheetError::ToolMissing(self.ffmpeg.clone()),
                _ => SheetError::Decode(format!("failed to run {}: {}", self.ffmpeg, e)),
            })?;

        let len = self.frame_len();
        if !output.status.success() || output.stdout.len() < len {
            warn!(
                "⚠️ No frame decoded at {:.3}s ({} bytes)",
                secs,
                output.stdout.len()
            );
            return Err(SheetError::Decode(format!(
                "no frame at {:.3}s: {}",
                secs,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut data = output.stdout;
        data.truncate(len);
        let number = (secs * self.info.frame_rate).floor() as u64;
        Ok(Frame::new(
            self.info.width,
            self.info.height,
            data,
            timestamp,
            number,
        ))
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        debug!("🗑️ FfmpegVideo: released {}", self.path.display());
    }
}

/// Reads until `buf` is full or EOF; returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_stream_checks_exit_status() {
        assert!(FfmpegVideo::check_end_of_stream(true, 1950, 1950).is_ok());
        // nb_frames 只是估计值，少几帧也算正常结束
        assert!(FfmpegVideo::check_end_of_stream(true, 1948, 1950).is_ok());
        assert!(matches!(
            FfmpegVideo::check_end_of_stream(false, 700, 1950),
            Err(SheetError::Decode(_))
        ));
        assert!(matches!(
            FfmpegVideo::check_end_of_stream(true, 0, 1950),
            Err(SheetError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_rational() {
        assert_eq!(FfmpegVideo::parse_rational("30/1"), Some(30.0));
        let ntsc = FfmpegVideo::parse_rational("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.001);
        assert_eq!(FfmpegVideo::parse_rational("25"), Some(25.0));
        assert_eq!(FfmpegVideo::parse_rational("0/0"), None);
        assert_eq!(FfmpegVideo::parse_rational("0/1"), None);
        assert_eq!(FfmpegVideo::parse_rational("abc"), None);
    }

    #[test]
    fn test_parse_probe_with_frame_count() {
        let json = r#"{
            "streams": [{
                "width": 1280, "height": 720,
                "r_frame_rate": "30/1", "avg_frame_rate": "30/1",
                "nb_frames": "1950", "duration": "65.000000"
            }],
            "format": { "duration": "65.020000" }
        }"#;
        let info = FfmpegVideo::parse_probe(json).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert_eq!(info.frame_rate, 30.0);
        assert_eq!(info.frame_count, 1950);
    }

    #[test]
    fn test_parse_probe_falls_back_to_duration() {
        // webm 容器通常没有 nb_frames
        let json = r#"{
            "streams": [{ "width": 640, "height": 360, "r_frame_rate": "25/1", "avg_frame_rate": "0/0" }],
            "format": { "duration": "12.0" }
        }"#;
        let info = FfmpegVideo::parse_probe(json).unwrap();
        assert_eq!(info.frame_rate, 25.0);
        assert_eq!(info.frame_count, 300);
    }

    #[test]
    fn test_parse_probe_zero_frame_rate() {
        let json = r#"{
            "streams": [{ "width": 640, "height": 360, "r_frame_rate": "0/0", "avg_frame_rate": "0/0", "nb_frames": "10" }]
        }"#;
        assert!(matches!(
            FfmpegVideo::parse_probe(json),
            Err(SheetError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_probe_missing_duration() {
        let json = r#"{
            "streams": [{ "width": 640, "height": 360, "r_frame_rate": "30/1" }],
            "format": {}
        }"#;
        assert!(matches!(
            FfmpegVideo::parse_probe(json),
            Err(SheetError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_probe_no_stream() {
        assert!(matches!(
            FfmpegVideo::parse_probe(r#"{ "streams": [] }"#),
            Err(SheetError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let result = FfmpegVideo::open(Path::new("/nonexistent/lesson.mp4"));
        assert!(matches!(result, Err(SheetError::SourceUnavailable(_))));
    }

    #[test]
    fn test_read_full_short_input() {
        let mut reader: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 5];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }
}
