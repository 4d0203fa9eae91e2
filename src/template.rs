use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{MarkId, Size};

/// A form template: the nominal canvas plus a tree of groups and marks, all
/// in template units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub nodes: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TemplateNode {
    /// A container whose optional transform applies to every descendant.
    #[serde(rename_all = "camelCase")]
    Group {
        #[serde(default)]
        transform: Option<Transform>,
        #[serde(default)]
        children: Vec<TemplateNode>,
    },

    /// A single checkbox or bubble.
    Mark(MarkNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkNode {
    pub id: MarkId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub transform: Option<Transform>,
}

/// A mark pulled out of the template tree together with its offset chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkDefinition {
    pub id: MarkId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// The mark's own transform followed by each enclosing group's, innermost
    /// first. `None` entries contribute no offset.
    pub chain: Vec<Option<Transform>>,
}

/// One positional transform function, as found in an SVG `transform`
/// attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TransformFn {
    Translate {
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Scale {
        x: f64,
        #[serde(default)]
        y: Option<f64>,
    },
    Rotate {
        angle: f64,
        #[serde(default)]
        cx: f64,
        #[serde(default)]
        cy: f64,
    },
    SkewX {
        angle: f64,
    },
    SkewY {
        angle: f64,
    },
    Matrix {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
}

impl TransformFn {
    /// The offset this function applies, if it is a pure translation.
    pub fn translation(&self) -> Option<(f64, f64)> {
        match *self {
            TransformFn::Translate { x, y } => Some((x, y)),
            TransformFn::Matrix { a, b, c, d, e, f }
                if a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 =>
            {
                Some((e, f))
            }
            _ => None,
        }
    }
}

impl Display for TransformFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformFn::Translate { x, y } => write!(f, "translate({}, {})", x, y),
            TransformFn::Scale { x, y: Some(y) } => write!(f, "scale({}, {})", x, y),
            TransformFn::Scale { x, y: None } => write!(f, "scale({})", x),
            TransformFn::Rotate { angle, cx, cy } => {
                if *cx == 0.0 && *cy == 0.0 {
                    write!(f, "rotate({})", angle)
                } else {
                    write!(f, "rotate({}, {}, {})", angle, cx, cy)
                }
            }
            TransformFn::SkewX { angle } => write!(f, "skewX({})", angle),
            TransformFn::SkewY { angle } => write!(f, "skewY({})", angle),
            TransformFn::Matrix { a, b, c, d, e, f: ff } => {
                write!(f, "matrix({}, {}, {}, {}, {}, {})", a, b, c, d, e, ff)
            }
        }
    }
}

/// An ordered list of transform functions attached to one node. Accepts an
/// SVG transform string, a single structured function, or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransform", into = "Vec<TransformFn>")]
pub struct Transform(Vec<TransformFn>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTransform {
    Svg(String),
    One(TransformFn),
    List(Vec<TransformFn>),
}

impl TryFrom<RawTransform> for Transform {
    type Error = String;

    fn try_from(raw: RawTransform) -> Result<Self, Self::Error> {
        match raw {
            RawTransform::Svg(s) => Transform::parse(&s),
            RawTransform::One(function) => Ok(Transform::new(vec![function])),
            RawTransform::List(functions) => Ok(Transform::new(functions)),
        }
    }
}

impl From<Transform> for Vec<TransformFn> {
    fn from(transform: Transform) -> Self {
        transform.0
    }
}

impl Transform {
    pub fn new(functions: Vec<TransformFn>) -> Self {
        Self(functions)
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self(vec![TransformFn::Translate { x, y }])
    }

    pub fn functions(&self) -> &[TransformFn] {
        &self.0
    }

    /// Total offset of the list, or `None` if any member is not a pure
    /// translation.
    pub fn translation(&self) -> Option<(f64, f64)> {
        self.0.iter().try_fold((0.0, 0.0), |(tx, ty), function| {
            let (dx, dy) = function.translation()?;
            Some((tx + dx, ty + dy))
        })
    }

    /// Parses SVG transform-attribute syntax, e.g. `translate(10 20) rotate(5)`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut functions = vec![];
        let mut rest = s.trim_start_matches(is_separator);

        while !rest.is_empty() {
            let name_len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            let name = &rest[..name_len];
            let after_name = rest[name_len..].trim_start();
            let Some(after_open) = after_name.strip_prefix('(') else {
                return Err(format!("expected '(' after {:?} in transform {:?}", name, s));
            };
            let Some(close) = after_open.find(')') else {
                return Err(format!("unterminated {:?} in transform {:?}", name, s));
            };

            let args = parse_numbers(&after_open[..close])
                .map_err(|bad| format!("invalid number {:?} in transform {:?}", bad, s))?;

            functions.push(transform_fn_from_args(name, &args).ok_or_else(|| {
                format!(
                    "unsupported transform syntax {}({:?}) in {:?}",
                    name, args, s
                )
            })?);

            rest = after_open[close + 1..].trim_start_matches(is_separator);
        }

        Ok(Transform(functions))
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, function) in self.functions().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Splits an SVG argument list into numbers. Besides whitespace and commas,
/// a sign or a second decimal point starts a new number, so `-5-3` is two
/// arguments and `.5.5` is two halves. On failure returns the bad token.
fn parse_numbers(args: &str) -> Result<Vec<f64>, String> {
    let bytes = args.as_bytes();
    let mut numbers = vec![];
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() || bytes[i] == b',' {
            i += 1;
            continue;
        }

        let start = i;
        if bytes[i] == b'+' || bytes[i] == b'-' {
            i += 1;
        }
        let mut seen_dot = false;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || (bytes[i] == b'.' && !seen_dot)) {
            seen_dot |= bytes[i] == b'.';
            i += 1;
        }
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            let mut j = i + 1;
            if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                i = j;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
        }

        if i == start {
            return Err(args[start..].to_string());
        }
        let token = &args[start..i];
        numbers.push(token.parse::<f64>().map_err(|_| token.to_string())?);
    }

    Ok(numbers)
}

fn transform_fn_from_args(name: &str, args: &[f64]) -> Option<TransformFn> {
    Some(match (name, args) {
        ("translate", [x]) => TransformFn::Translate { x: *x, y: 0.0 },
        ("translate", [x, y]) => TransformFn::Translate { x: *x, y: *y },
        ("scale", [x]) => TransformFn::Scale { x: *x, y: None },
        ("scale", [x, y]) => TransformFn::Scale { x: *x, y: Some(*y) },
        ("rotate", [angle]) => TransformFn::Rotate {
            angle: *angle,
            cx: 0.0,
            cy: 0.0,
        },
        ("rotate", [angle, cx, cy]) => TransformFn::Rotate {
            angle: *angle,
            cx: *cx,
            cy: *cy,
        },
        ("skewX", [angle]) => TransformFn::SkewX { angle: *angle },
        ("skewY", [angle]) => TransformFn::SkewY { angle: *angle },
        ("matrix", [a, b, c, d, e, f]) => TransformFn::Matrix {
            a: *a,
            b: *b,
            c: *c,
            d: *d,
            e: *e,
            f: *f,
        },
        _ => return None,
    })
}

#[derive(Debug)]
pub enum TemplateError {
    Io(PathBuf, std::io::Error),
    Parse(serde_json::Error),
    InvalidCanvas(f64, f64),
    DuplicateMarkId(MarkId),
    NonPositiveMarkSize(MarkId),
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::Io(path, e) => {
                write!(f, "unable to read template {}: {}", path.display(), e)
            }
            TemplateError::Parse(e) => write!(f, "unable to parse template: {}", e),
            TemplateError::InvalidCanvas(width, height) => {
                write!(f, "template canvas must be positive, got {}x{}", width, height)
            }
            TemplateError::DuplicateMarkId(id) => write!(f, "duplicate mark id {:?}", id.as_str()),
            TemplateError::NonPositiveMarkSize(id) => {
                write!(f, "mark {:?} must have a positive width and height", id.as_str())
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl Template {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let json =
            std::fs::read_to_string(path).map_err(|e| TemplateError::Io(path.to_path_buf(), e))?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let template: Template = serde_json::from_str(json).map_err(TemplateError::Parse)?;
        template.validate()?;
        Ok(template)
    }

    pub fn canvas_size(&self) -> Size<f64> {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(TemplateError::InvalidCanvas(self.width, self.height));
        }

        let mut seen = HashSet::new();
        for mark in self.marks() {
            if !(mark.width > 0.0 && mark.height > 0.0) {
                return Err(TemplateError::NonPositiveMarkSize(mark.id));
            }
            if !seen.insert(mark.id.clone()) {
                return Err(TemplateError::DuplicateMarkId(mark.id));
            }
        }

        Ok(())
    }

    /// Flattens the tree into mark definitions in document order. Walks with
    /// an explicit stack so nesting depth is bounded only by memory.
    pub fn marks(&self) -> Vec<MarkDefinition> {
        let mut marks = vec![];
        let mut ancestors: Vec<Option<&Transform>> = vec![];
        let mut stack: Vec<(usize, &TemplateNode)> =
            self.nodes.iter().rev().map(|node| (0, node)).collect();

        while let Some((depth, node)) = stack.pop() {
            ancestors.truncate(depth);
            match node {
                TemplateNode::Group {
                    transform,
                    children,
                } => {
                    ancestors.push(transform.as_ref());
                    stack.extend(children.iter().rev().map(|child| (depth + 1, child)));
                }
                TemplateNode::Mark(mark) => {
                    let chain = std::iter::once(mark.transform.clone())
                        .chain(ancestors.iter().rev().map(|t| t.cloned()))
                        .collect();
                    marks.push(MarkDefinition {
                        id: mark.id.clone(),
                        x: mark.x,
                        y: mark.y,
                        width: mark.width,
                        height: mark.height,
                        chain,
                    });
                }
            }
        }

        marks
    }
}
