pub mod ffmpeg;
pub mod frame;
pub mod sampler;

pub use ffmpeg::FfmpegVideo;
pub use frame::{CandidateFrame, Frame};
pub use sampler::{CandidateFrames, FrameSampler};

use crate::core::error::Result;
use std::time::Duration;

/// 视频元数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// 源帧率（帧/秒）
    pub frame_rate: f64,
    pub frame_count: u64,
}

impl VideoInfo {
    /// Duration in seconds, derived as `frame_count / frame_rate`.
    pub fn duration(&self) -> f64 {
        if self.frame_rate > 0.0 {
            self.frame_count as f64 / self.frame_rate
        } else {
            0.0
        }
    }

    pub fn timestamp_of(&self, frame_number: u64) -> Duration {
        if self.frame_rate > 0.0 {
            Duration::from_secs_f64(frame_number as f64 / self.frame_rate)
        } else {
            Duration::ZERO
        }
    }
}

/// 可随机定位的视频源，由流水线在单次运行内独占
///
/// Sequential decode and time-based seek share decoder state, so every
/// method takes `&mut self`.
pub trait VideoSource {
    fn info(&self) -> VideoInfo;

    /// Restarts sequential decoding from the first frame.
    fn rewind(&mut self) -> Result<()>;

    /// Decodes the next frame in stream order; `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Advances past one frame without materializing it. Returns `false` at
    /// end of stream.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.next_frame()?.is_some())
    }

    /// Seeks by presentation time and decodes exactly one frame.
    fn frame_at(&mut self, timestamp: Duration) -> Result<Frame>;
}
