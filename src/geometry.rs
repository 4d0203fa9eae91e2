use std::fmt::Display;

use imageproc::rect::Rect;
use logging_timer::time;
use rayon::prelude::*;
use serde::Serialize;

use crate::template::{MarkDefinition, Transform};
use crate::types::{MarkId, Size};

/// A mark's region in image pixel space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedRect {
    pub id: MarkId,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ResolvedRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether every pixel of the region lies within an image of `size`.
    pub fn fits_within(&self, size: (u32, u32)) -> bool {
        let (width, height) = size;
        self.x >= 0
            && self.y >= 0
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    /// The equivalent `imageproc` rectangle, unless the region is empty.
    pub fn to_rect(&self) -> Option<Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(Rect::at(self.x, self.y).of_size(self.width, self.height))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    UnsupportedTransform { mark: MarkId, transform: Transform },
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnsupportedTransform { mark, transform } => write!(
                f,
                "mark {:?} is placed by a non-translation transform: {}",
                mark.as_str(),
                transform
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Horizontal and vertical pixels per template unit.
pub fn scale_factors(canvas: Size<f64>, image_size: (u32, u32)) -> Size<f64> {
    let (width, height) = image_size;
    Size {
        width: width as f64 / canvas.width,
        height: height as f64 / canvas.height,
    }
}

/// Sums the translations along a mark's offset chain, stopping at the first
/// transform that is not a pure translation.
pub fn effective_offset(mark: &MarkDefinition) -> Result<(f64, f64), ResolveError> {
    let mut offset = (0.0, 0.0);
    for transform in mark.chain.iter().flatten() {
        let Some((tx, ty)) = transform.translation() else {
            return Err(ResolveError::UnsupportedTransform {
                mark: mark.id.clone(),
                transform: transform.clone(),
            });
        };
        offset.0 += tx;
        offset.1 += ty;
    }
    Ok(offset)
}

fn resolve_mark(mark: &MarkDefinition, scale: Size<f64>) -> Result<ResolvedRect, ResolveError> {
    let (tx, ty) = effective_offset(mark)?;
    Ok(ResolvedRect {
        id: mark.id.clone(),
        x: ((mark.x + tx) * scale.width).floor() as i32,
        y: ((mark.y + ty) * scale.height).floor() as i32,
        width: (mark.width * scale.width).floor() as u32,
        height: (mark.height * scale.height).floor() as u32,
    })
}

/// Resolves every mark to a pixel rectangle for an image of `image_size`.
/// Output order matches `marks`; no bounds checking happens here.
#[time]
pub fn resolve_rectangles(
    canvas: Size<f64>,
    marks: &[MarkDefinition],
    image_size: (u32, u32),
) -> Result<Vec<ResolvedRect>, ResolveError> {
    let scale = scale_factors(canvas, image_size);
    log::debug!(
        "resolving {} marks with scale {:.4}x{:.4}",
        marks.len(),
        scale.width,
        scale.height
    );

    // Gather in order so the first failing mark is the one reported.
    marks
        .par_iter()
        .map(|mark| resolve_mark(mark, scale))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
