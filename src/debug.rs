use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;

use crate::{
    classify::ClassificationResult,
    geometry::ResolvedRect,
    image_utils::{BLUE, DARK_GREEN, ORANGE, PINK, RED},
    types::FillState,
};

/// Creates a path for a debug image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ));
    result
}

/// Writes labeled debug images next to the scanned image, or nothing at all
/// when disabled.
pub struct ImageDebugWriter {
    input_path: PathBuf,
    input_image: Option<GrayImage>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf, input_image: GrayImage) -> Self {
        Self {
            input_path,
            input_image: Some(input_image),
        }
    }

    pub fn disabled() -> Self {
        Self {
            input_path: PathBuf::new(),
            input_image: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.input_image.is_some()
    }

    /// Saves `img` as-is under `label`.
    pub fn write_gray(&self, label: &str, img: &GrayImage) -> Option<PathBuf> {
        if !self.is_enabled() {
            return None;
        }
        self.save(label, img)
    }

    /// Draws on an RGB copy of the input image and saves it under `label`.
    pub fn write(&self, label: &str, draw: impl FnOnce(&mut RgbImage)) -> Option<PathBuf> {
        let input_image = self.input_image.as_ref()?;
        let mut canvas = DynamicImage::ImageLuma8(input_image.clone()).into_rgb8();
        draw(&mut canvas);
        self.save(label, &canvas)
    }

    fn save<I: ImageSave>(&self, label: &str, img: &I) -> Option<PathBuf> {
        let path = debug_image_path(&self.input_path, label);
        match img.save_png(&path) {
            Ok(()) => {
                log::info!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("unable to write debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

trait ImageSave {
    fn save_png(&self, path: &Path) -> image::ImageResult<()>;
}

impl ImageSave for GrayImage {
    fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.save_with_format(path, image::ImageFormat::Png)
    }
}

impl ImageSave for RgbImage {
    fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.save_with_format(path, image::ImageFormat::Png)
    }
}

/// Display color for a fill state.
pub fn state_color(state: FillState) -> Rgb<u8> {
    match state {
        FillState::Void => BLUE,
        FillState::Ambiguous => ORANGE,
        FillState::Filled => DARK_GREEN,
        FillState::Overfilled => RED,
    }
}

/// Highlights every pixel the line suppressor changed.
pub fn draw_removed_pixels_mut(canvas: &mut RgbImage, original: &GrayImage, cleaned: &GrayImage) {
    for (x, y, pixel) in original.enumerate_pixels() {
        if pixel != cleaned.get_pixel(x, y) && x < canvas.width() && y < canvas.height() {
            canvas.put_pixel(x, y, PINK);
        }
    }
}

fn tint_rect_mut(canvas: &mut RgbImage, rect: &ResolvedRect, color: Rgb<u8>, alpha: f32) {
    let left = rect.x.max(0) as u32;
    let top = rect.y.max(0) as u32;
    let right = (rect.x as i64 + rect.width as i64).clamp(0, canvas.width() as i64) as u32;
    let bottom = (rect.y as i64 + rect.height as i64).clamp(0, canvas.height() as i64) as u32;

    for y in top..bottom {
        for x in left..right {
            let pixel = canvas.get_pixel_mut(x, y);
            for (channel, tint) in pixel.0.iter_mut().zip(color.0) {
                *channel = (*channel as f32 * (1.0 - alpha) + tint as f32 * alpha).round() as u8;
            }
        }
    }
}

/// Tints and outlines each mark's region by its classified state.
pub fn draw_classified_marks_mut(
    canvas: &mut RgbImage,
    rects: &[ResolvedRect],
    results: &[ClassificationResult],
) {
    for (rect, result) in rects.iter().zip(results) {
        let color = state_color(result.state);
        tint_rect_mut(canvas, rect, color, 0.35);
        if let Some(outline) = rect.to_rect() {
            draw_hollow_rect_mut(canvas, outline, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::image_utils::{BLACK, WHITE};
    use crate::types::MarkId;

    const WHITE_RGB: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn debug_path_sits_next_to_input() {
        assert_eq!(
            debug_image_path(Path::new("/scans/form-01.png"), "marks"),
            PathBuf::from("/scans/form-01_debug_marks.png")
        );
    }

    #[test]
    fn overlay_marks_removed_pixels_and_states() {
        let mut original = GrayImage::from_pixel(20, 20, WHITE);
        original.put_pixel(0, 0, BLACK);
        let cleaned = GrayImage::from_pixel(20, 20, WHITE);

        let rect = ResolvedRect {
            id: MarkId::from("a".to_string()),
            x: 5,
            y: 5,
            width: 6,
            height: 6,
        };
        let result = ClassificationResult {
            id: rect.id.clone(),
            state: FillState::Overfilled,
            score: 1.0,
        };

        let mut canvas = DynamicImage::ImageLuma8(original.clone()).into_rgb8();
        draw_removed_pixels_mut(&mut canvas, &original, &cleaned);
        draw_classified_marks_mut(&mut canvas, &[rect], &[result]);

        assert_eq!(*canvas.get_pixel(0, 0), PINK);
        assert_eq!(*canvas.get_pixel(5, 5), RED);
        assert_eq!(*canvas.get_pixel(19, 19), WHITE_RGB);
        let inside = canvas.get_pixel(7, 7);
        assert_eq!(inside.0[0], 255);
        assert!(inside.0[1] < 255);
    }

    #[test]
    fn tint_clips_to_canvas() {
        let mut canvas = RgbImage::from_pixel(4, 4, WHITE_RGB);
        let rect = ResolvedRect {
            id: MarkId::from("edge".to_string()),
            x: -2,
            y: 2,
            width: 10,
            height: 10,
        };
        tint_rect_mut(&mut canvas, &rect, BLUE, 1.0);
        assert_eq!(*canvas.get_pixel(0, 3), BLUE);
        assert_eq!(*canvas.get_pixel(3, 1), WHITE_RGB);
    }

    #[test]
    fn disabled_writer_writes_nothing() {
        let writer = ImageDebugWriter::disabled();
        assert!(!writer.is_enabled());
        assert_eq!(writer.write("marks", |_| {}), None);
        assert_eq!(writer.write_gray("cleaned", &GrayImage::new(1, 1)), None);
    }

    #[test]
    fn enabled_writer_saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("scan.png");
        let writer = ImageDebugWriter::new(input_path, GrayImage::from_pixel(3, 3, Luma([9])));

        let path = writer.write("marks", |canvas| canvas.put_pixel(1, 1, PINK)).unwrap();
        assert_eq!(path, dir.path().join("scan_debug_marks.png"));

        let written = image::open(&path).unwrap().into_rgb8();
        assert_eq!(*written.get_pixel(1, 1), PINK);
        assert_eq!(*written.get_pixel(0, 0), Rgb([9, 9, 9]));
    }
}
