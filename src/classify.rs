use std::fmt::Display;

use image::{imageops, GrayImage};
use logging_timer::time;
use rayon::prelude::*;
use serde::Serialize;

use crate::calibration::Calibration;
use crate::geometry::ResolvedRect;
use crate::image_utils::dark_ratio;
use crate::types::{FillState, MarkId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub id: MarkId,
    pub state: FillState,
    /// Fraction of the region's pixels darker than the black level.
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyError {
    OutOfBoundsRegion {
        rect: ResolvedRect,
        image_size: (u32, u32),
    },
    EmptyRegion(ResolvedRect),
}

impl Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifyError::OutOfBoundsRegion { rect, image_size } => write!(
                f,
                "mark {:?} at {}x{}+{}+{} extends outside the {}x{} image",
                rect.id.as_str(),
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                image_size.0,
                image_size.1
            ),
            ClassifyError::EmptyRegion(rect) => {
                write!(f, "mark {:?} resolves to an empty region", rect.id.as_str())
            }
        }
    }
}

impl std::error::Error for ClassifyError {}

/// Maps a dark-pixel fraction to a fill state. Rules are checked in order
/// and the first match wins.
pub fn classify_score(score: f32, calibration: &Calibration) -> FillState {
    if score > calibration.overfilled_threshold {
        FillState::Overfilled
    } else if score > calibration.filled_threshold {
        FillState::Filled
    } else if score < calibration.void_threshold {
        FillState::Void
    } else {
        FillState::Ambiguous
    }
}

/// Dark-pixel fraction inside `rect`, which must lie within the image.
pub fn score_region(img: &GrayImage, rect: &ResolvedRect, black_level: u8) -> f32 {
    let region = imageops::crop_imm(
        img,
        rect.x as u32,
        rect.y as u32,
        rect.width,
        rect.height,
    )
    .to_image();
    dark_ratio(&region, black_level)
}

fn check_region(rect: &ResolvedRect, image_size: (u32, u32)) -> Result<(), ClassifyError> {
    if rect.area() == 0 {
        return Err(ClassifyError::EmptyRegion(rect.clone()));
    }
    if !rect.fits_within(image_size) {
        return Err(ClassifyError::OutOfBoundsRegion {
            rect: rect.clone(),
            image_size,
        });
    }
    Ok(())
}

/// Scores and classifies every region, in input order. Every region is
/// checked against the image bounds before any is measured.
#[time]
pub fn classify_marks(
    img: &GrayImage,
    rects: &[ResolvedRect],
    calibration: &Calibration,
) -> Result<Vec<ClassificationResult>, ClassifyError> {
    for rect in rects {
        check_region(rect, img.dimensions())?;
    }

    let results = rects
        .par_iter()
        .map(|rect| {
            let score = score_region(img, rect, calibration.black_level);
            let state = classify_score(score, calibration);
            log::debug!("{}: score={:.4} state={}", rect.id, score, state);
            ClassificationResult {
                id: rect.id.clone(),
                state,
                score,
            }
        })
        .collect::<Vec<_>>();

    Ok(results)
}
