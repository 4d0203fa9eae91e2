use image::GrayImage;
use logging_timer::time;
use rayon::prelude::*;

use crate::calibration::Calibration;
use crate::image_utils::{DarknessIntegral, WHITE};

/// A square window whose central horizontal and vertical bands weigh +1 and
/// whose remaining cells weigh -1. Over a long straight rule the bands are
/// darker than the rest of the window, giving a positive response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossWindow {
    /// Half the window side, i.e. `(L - 1) / 2`.
    pub radius: u32,
    /// Half-width of each band; bands span `2 * band - 1` pixels.
    pub band: u32,
}

impl CrossWindow {
    pub fn from_calibration(calibration: &Calibration) -> Self {
        Self {
            radius: calibration.line_window / 2,
            band: calibration.line_band,
        }
    }

    /// Normalized response at image pixel `(x, y)`, in `[-1, 1]`.
    ///
    /// Equals `(sum(band darkness) - sum(off-band darkness)) / (255 * n)`,
    /// computed from box sums as `2 * band - window`. Cells falling outside
    /// the image are dropped from the window, and `n` counts the remaining
    /// cells, so a rule lying on the border still outweighs its window.
    pub fn response_at(&self, integral: &DarknessIntegral, x: u32, y: u32) -> f32 {
        let (x, y) = (x as i64, y as i64);
        let r = self.radius as i64;
        let (near, far) = (self.band as i64 - 1, self.band as i64);

        let window = integral.sum(x - r, y - r, x + r + 1, y + r + 1);
        let horizontal = integral.sum(x - r, y - near, x + r + 1, y + far);
        let vertical = integral.sum(x - near, y - r, x + far, y + r + 1);
        let center = integral.sum(x - near, y - near, x + far, y + far);
        let band = horizontal + vertical - center;
        let cells = integral.area(x - r, y - r, x + r + 1, y + r + 1);

        let weighted = 2.0 * band as f64 - window as f64;
        (weighted / (u8::MAX as f64 * cells as f64)) as f32
    }
}

/// Whites out pixels that lie under long horizontal or vertical strokes,
/// such as table borders and box outlines, leaving other ink untouched.
///
/// Returns a new image; the source is not modified. Near the border the
/// window is cut to the image rather than padded.
#[time]
pub fn clean_ruling_lines(img: &GrayImage, calibration: &Calibration) -> GrayImage {
    let mut out = img.clone();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return out;
    }

    let window = CrossWindow::from_calibration(calibration);
    let integral = DarknessIntegral::new(img);
    let threshold = calibration.line_threshold;

    out.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.iter_mut().enumerate() {
                if window.response_at(&integral, x as u32, y as u32) > threshold {
                    *pixel = WHITE.0[0];
                }
            }
        });

    log::info!(
        "line suppression removed {} of {} pixels",
        count_removed_pixels(img, &out),
        width as u64 * height as u64
    );

    out
}

/// Counts pixels that were turned white by [`clean_ruling_lines`].
pub fn count_removed_pixels(original: &GrayImage, cleaned: &GrayImage) -> usize {
    original
        .pixels()
        .zip(cleaned.pixels())
        .filter(|(before, after)| before != after)
        .count()
}

#[cfg(test)]
mod tests {
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use super::*;
    use crate::image_utils::BLACK;

    fn noise_image(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut state = seed;
        GrayImage::from_fn(width, height, |_, _| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            Luma([(state >> 56) as u8])
        })
    }

    #[test]
    fn removes_full_width_horizontal_rule() {
        let calibration = Calibration::default();
        let mut img = GrayImage::from_pixel(100, 100, WHITE);
        draw_filled_rect_mut(
            &mut img,
            Rect::at(0, 48).of_size(100, calibration.line_band),
            BLACK,
        );

        let cleaned = clean_ruling_lines(&img, &calibration);
        assert!(cleaned.pixels().all(|p| *p == WHITE));
        assert_eq!(count_removed_pixels(&img, &cleaned), 300);
        assert_eq!(*img.get_pixel(50, 49), BLACK);
    }

    #[test]
    fn removes_rules_touching_the_border() {
        let calibration = Calibration::default();
        let band = calibration.line_band;
        let mut img = GrayImage::from_pixel(100, 100, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(100, band), BLACK);
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(band, 100), BLACK);
        draw_filled_rect_mut(&mut img, Rect::at(0, 100 - band as i32).of_size(100, band), BLACK);
        draw_filled_rect_mut(&mut img, Rect::at(100 - band as i32, 0).of_size(band, 100), BLACK);

        let cleaned = clean_ruling_lines(&img, &calibration);
        assert!(cleaned.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn edge_response_counts_only_image_cells() {
        let window = CrossWindow::from_calibration(&Calibration::default());
        let mut img = GrayImage::from_pixel(100, 100, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(100, 3), BLACK);

        let integral = DarknessIntegral::new(&img);
        // 3 dark rows, all in the band, in a window cut to rows 0..=16.
        let response = window.response_at(&integral, 50, 1);
        assert!((response - 3.0 / 17.0).abs() < 1e-6, "{}", response);
    }

    #[test]
    fn removes_full_height_vertical_rule() {
        let calibration = Calibration::default();
        let mut img = GrayImage::from_pixel(80, 60, WHITE);
        draw_filled_rect_mut(
            &mut img,
            Rect::at(20, 0).of_size(calibration.line_band, 60),
            BLACK,
        );

        let cleaned = clean_ruling_lines(&img, &calibration);
        assert!(cleaned.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn response_over_rule_is_band_over_side() {
        let calibration = Calibration::default();
        let window = CrossWindow::from_calibration(&calibration);
        let mut img = GrayImage::from_pixel(100, 100, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(0, 48).of_size(100, 3), BLACK);

        let integral = DarknessIntegral::new(&img);
        let response = window.response_at(&integral, 50, 49);
        assert!((response - 3.0 / 31.0).abs() < 1e-6, "{}", response);
        assert_eq!(window.response_at(&integral, 50, 10), 0.0);
    }

    #[test]
    fn keeps_noise_unchanged() {
        let img = noise_image(64, 48, 7);
        let cleaned = clean_ruling_lines(&img, &Calibration::default());
        assert_eq!(cleaned, img);
    }

    #[test]
    fn keeps_filled_box_and_short_stroke() {
        let mut img = GrayImage::from_pixel(100, 100, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(20, 20), BLACK);
        draw_filled_rect_mut(&mut img, Rect::at(60, 60).of_size(10, 3), BLACK);

        let cleaned = clean_ruling_lines(&img, &Calibration::default());
        assert_eq!(cleaned, img);
    }

    #[test]
    fn removes_rule_but_keeps_nearby_mark() {
        let mut img = GrayImage::from_pixel(120, 100, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(0, 10).of_size(120, 3), BLACK);
        draw_filled_rect_mut(&mut img, Rect::at(50, 50).of_size(20, 20), BLACK);

        let cleaned = clean_ruling_lines(&img, &Calibration::default());
        assert_eq!(*cleaned.get_pixel(60, 11), WHITE);
        for y in 50..70 {
            for x in 50..70 {
                assert_eq!(*cleaned.get_pixel(x, y), BLACK);
            }
        }
    }

    #[test]
    fn empty_image_is_returned_as_is() {
        let img = GrayImage::new(0, 0);
        assert_eq!(clean_ruling_lines(&img, &Calibration::default()), img);
    }
}
