//! 锐化增强 - 固定 3x3 卷积，提升细音符笔画的清晰度

use crate::core::config::EnhanceConfig;
use image::RgbImage;
use rayon::prelude::*;

pub struct Sharpener {
    kernel: [[i32; 3]; 3],
}

impl Sharpener {
    pub fn new(config: &EnhanceConfig) -> Self {
        Self {
            kernel: config.kernel,
        }
    }

    /// Reflects an out-of-range coordinate back inside `[0, len)` without
    /// repeating the edge pixel (`dcb|abcd|cba`).
    fn reflect(pos: i64, len: i64) -> usize {
        if len == 1 {
            return 0;
        }
        let mut p = pos;
        if p < 0 {
            p = -p;
        }
        if p >= len {
            p = 2 * (len - 1) - p;
        }
        p.clamp(0, len - 1) as usize
    }

    /// 每个通道独立卷积，结果饱和到 0..=255
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image.clone();
        }

        let w = width as usize;
        let src = image.as_raw();
        let kernel = self.kernel;
        let mut out = vec![0u8; src.len()];

        out.par_chunks_mut(w * 3)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..w {
                    for c in 0..3 {
                        let mut acc = 0i32;
                        for (ky, kernel_row) in kernel.iter().enumerate() {
                            let sy = Self::reflect(y as i64 + ky as i64 - 1, height as i64);
                            for (kx, &weight) in kernel_row.iter().enumerate() {
                                if weight == 0 {
                                    continue;
                                }
                                let sx = Self::reflect(x as i64 + kx as i64 - 1, width as i64);
                                acc += weight * src[(sy * w + sx) * 3 + c] as i32;
                            }
                        }
                        row[x * 3 + c] = acc.clamp(0, 255) as u8;
                    }
                }
            });

        RgbImage::from_raw(width, height, out).unwrap_or_else(|| image.clone())
    }
}

impl Default for Sharpener {
    fn default() -> Self {
        Self::new(&EnhanceConfig::default())
    }
}
