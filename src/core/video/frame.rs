use image::{GrayImage, RgbImage};
use std::time::Duration;

/// 解码后的视频帧（RGB24 格式）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp: Duration,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp,
            frame_number,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Byte length of one rgb24 frame with the given dimensions.
    pub fn expected_len(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 3
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
    }

    /// 转为灰度图，供文字识别使用
    pub fn to_gray(&self) -> GrayImage {
        let gray: Vec<u8> = self
            .data
            .chunks_exact(3)
            .map(|rgb| {
                let r = rgb[0] as u32;
                let g = rgb[1] as u32;
                let b = rgb[2] as u32;
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            })
            .collect();

        GrayImage::from_raw(self.width, self.height, gray)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Consumes the frame into an `RgbImage`; `None` if the buffer is truncated.
    pub fn into_rgb_image(self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data)
    }
}

/// 采样器产出的候选帧，只用于页数检测，不保留
#[derive(Debug, Clone)]
pub struct CandidateFrame {
    pub frame: Frame,
}

impl CandidateFrame {
    pub fn timestamp(&self) -> Duration {
        self.frame.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 3]; // 100x100 white image
        let frame = Frame::new(100, 100, data, Duration::from_millis(1000), 30);

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.timestamp.as_millis(), 1000);
        assert_eq!(frame.frame_number, 30);
        assert!(frame.is_complete());
    }

    #[test]
    fn test_frame_to_gray() {
        let mut data = Vec::with_capacity(2 * 3);
        data.extend_from_slice(&[255, 0, 0]);
        data.extend_from_slice(&[10, 10, 10]);
        let frame = Frame::new(2, 1, data, Duration::ZERO, 0);

        let gray = frame.to_gray();
        assert_eq!(gray.dimensions(), (2, 1));
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 10);
    }

    #[test]
    fn test_truncated_frame() {
        let frame = Frame::new(10, 10, vec![0u8; 50], Duration::ZERO, 0);
        assert!(!frame.is_complete());
        assert!(frame.into_rgb_image().is_none());
    }
}
