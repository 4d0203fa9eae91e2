use std::fmt::Display;
use std::path::{Path, PathBuf};

use image::GrayImage;
use logging_timer::time;

use crate::calibration::Calibration;
use crate::classify::{classify_marks, ClassificationResult, ClassifyError};
use crate::debug::{draw_classified_marks_mut, draw_removed_pixels_mut, ImageDebugWriter};
use crate::geometry::{resolve_rectangles, ResolveError, ResolvedRect};
use crate::lines::clean_ruling_lines;
use crate::template::Template;

#[derive(Debug, Clone)]
pub struct InterpretOptions {
    pub debug: bool,
    pub calibration: Calibration,
}

/// Everything produced for one scanned form.
#[derive(Debug, Clone)]
pub struct InterpretedForm {
    pub rects: Vec<ResolvedRect>,
    pub cleaned: GrayImage,
    pub results: Vec<ClassificationResult>,
}

#[derive(Debug)]
pub enum InterpretError {
    ImageOpenError(PathBuf, image::ImageError),
    EmptyTemplate,
    Resolve(ResolveError),
    Classify(ClassifyError),
}

impl Display for InterpretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpretError::ImageOpenError(path, e) => {
                write!(f, "unable to open image {}: {}", path.display(), e)
            }
            InterpretError::EmptyTemplate => write!(f, "template declares no marks"),
            InterpretError::Resolve(e) => write!(f, "{}", e),
            InterpretError::Classify(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for InterpretError {}

impl From<ResolveError> for InterpretError {
    fn from(e: ResolveError) -> Self {
        InterpretError::Resolve(e)
    }
}

impl From<ClassifyError> for InterpretError {
    fn from(e: ClassifyError) -> Self {
        InterpretError::Classify(e)
    }
}

#[time]
pub fn load_form_image(image_path: &Path) -> Result<GrayImage, InterpretError> {
    match image::open(image_path) {
        Ok(img) => Ok(img.into_luma8()),
        Err(e) => Err(InterpretError::ImageOpenError(image_path.to_path_buf(), e)),
    }
}

/// Resolves, cleans and classifies. Rectangle resolution runs first so a bad
/// transform aborts before any pixel work happens.
#[time]
pub fn interpret_image(
    img: &GrayImage,
    template: &Template,
    calibration: &Calibration,
) -> Result<InterpretedForm, InterpretError> {
    let marks = template.marks();
    if marks.is_empty() {
        return Err(InterpretError::EmptyTemplate);
    }

    let rects = resolve_rectangles(template.canvas_size(), &marks, img.dimensions())?;
    let cleaned = clean_ruling_lines(img, calibration);
    let results = classify_marks(&cleaned, &rects, calibration)?;

    log::info!("classified {} marks", results.len());

    Ok(InterpretedForm {
        rects,
        cleaned,
        results,
    })
}

#[time]
pub fn interpret_form(
    image_path: &Path,
    template: &Template,
    options: &InterpretOptions,
) -> Result<Vec<ClassificationResult>, InterpretError> {
    if template.marks().is_empty() {
        return Err(InterpretError::EmptyTemplate);
    }

    let img = load_form_image(image_path)?;

    let debug = if options.debug {
        ImageDebugWriter::new(image_path.to_path_buf(), img.clone())
    } else {
        ImageDebugWriter::disabled()
    };

    let form = interpret_image(&img, template, &options.calibration)?;

    debug.write_gray("cleaned", &form.cleaned);
    debug.write("marks", |canvas| {
        draw_removed_pixels_mut(canvas, &img, &form.cleaned);
        draw_classified_marks_mut(canvas, &form.rects, &form.results);
    });

    Ok(form.results)
}
