use image::{GrayImage, Luma, Rgb};

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
#[cfg(test)]
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const DARK_GREEN: Rgb<u8> = Rgb([0, 127, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
pub const PINK: Rgb<u8> = Rgb([255, 0, 255]);

/// Determines the number of pixels in an image strictly darker than `level`.
pub fn count_pixels_darker_than(img: &GrayImage, level: u8) -> u32 {
    img.pixels().filter(|p| p.0[0] < level).count() as u32
}

/// Determines the ratio of pixels in an image strictly darker than `level`.
pub fn dark_ratio(img: &GrayImage, level: u8) -> f32 {
    let total = img.width() * img.height();
    count_pixels_darker_than(img, level) as f32 / total as f32
}

/// Summed-area table of pixel darkness (`255 - luma`). Box queries are
/// clipped to the image, so cells outside it contribute nothing.
pub struct DarknessIntegral {
    width: u32,
    height: u32,
    stride: usize,
    table: Vec<u64>,
}

impl DarknessIntegral {
    pub fn new(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        let stride = (w + 1) as usize;
        let mut table = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h {
            let mut row_sum: u64 = 0;
            for x in 0..w {
                row_sum += (u8::MAX - img.get_pixel(x, y).0[0]) as u64;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                table[idx] = row_sum + table[above];
            }
        }

        Self {
            width: w,
            height: h,
            stride,
            table,
        }
    }

    fn clip(&self, left: i64, top: i64, right: i64, bottom: i64) -> (usize, usize, usize, usize) {
        let x1 = left.clamp(0, self.width as i64) as usize;
        let y1 = top.clamp(0, self.height as i64) as usize;
        let x2 = right.clamp(0, self.width as i64) as usize;
        let y2 = bottom.clamp(0, self.height as i64) as usize;
        (x1, y1, x2.max(x1), y2.max(y1))
    }

    /// Number of image pixels within `[left, right) x [top, bottom)`.
    pub fn area(&self, left: i64, top: i64, right: i64, bottom: i64) -> u64 {
        let (x1, y1, x2, y2) = self.clip(left, top, right, bottom);
        ((x2 - x1) * (y2 - y1)) as u64
    }

    /// Darkness sum over the image pixels within `[left, right) x [top, bottom)`.
    pub fn sum(&self, left: i64, top: i64, right: i64, bottom: i64) -> u64 {
        let (x1, y1, x2, y2) = self.clip(left, top, right, bottom);
        self.table[y2 * self.stride + x2] + self.table[y1 * self.stride + x1]
            - self.table[y1 * self.stride + x2]
            - self.table[y2 * self.stride + x1]
    }
}
