use miette::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    context::DrawingContext,
    paint::{Color, FillStyle},
};

/// Appended to the last kept line when text does not fit the line budget.
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FontSpec {
    pub family: String,
    /// CSS-style weight, 100 (thin) to 900 (black)
    pub weight: u16,
    /// absolute size in pixels
    pub size: f64,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, weight: u16, size: f64) -> Self {
        Self {
            family: family.into(),
            weight,
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    /// `y` is the top of the line box
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock<'a> {
    pub text: &'a str,
    pub max_width: f64,
    pub max_lines: usize,
    pub font: &'a FontSpec,
    pub line_height: f64,
    pub color: Color,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<PlacedLine>,
    /// y just below the last rendered line; anchor for the next block
    pub used_height: f64,
}

/// Greedily wrap `text` on single spaces into at most `max_lines` lines whose
/// measured width stays under `max_width`.
///
/// Words are never split, so a single word wider than `max_width` still gets a
/// line of its own. When the text needs more lines than allowed, the words that
/// do not fit are dropped and the last kept line gets an [`ELLIPSIS`]. Width is
/// measured with whatever font is currently set on `ctx`.
pub fn get_lines<C: DrawingContext>(
    ctx: &C,
    text: &str,
    max_width: f64,
    max_lines: usize,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    let mut words = text.split(' ');
    let mut current_line = words.next().unwrap_or_default().to_owned();
    let mut truncated = false;

    for word in words {
        let test_line = format!("{current_line} {word}");
        if ctx.measure_text(&test_line) < max_width {
            current_line = test_line;
        } else if lines.len() == max_lines {
            truncated = true;
            break;
        } else {
            lines.push(std::mem::replace(&mut current_line, word.to_owned()));
        }
    }

    if lines.len() != max_lines {
        lines.push(current_line);
    } else {
        // budget is full: whatever is still pending never gets a line
        truncated = true;
    }

    if truncated {
        if let Some(last) = lines.last_mut() {
            last.push_str(ELLIPSIS);
        }
    }
    lines
}

/// Render `block` as top-aligned left-aligned lines, `line_height` apart.
///
/// The returned [`TextLayout::used_height`] is the y of the last line plus one
/// line height, so a following block anchored there never overlaps this one.
pub fn write_text<C: DrawingContext>(ctx: &mut C, block: &TextBlock<'_>) -> Result<TextLayout> {
    ctx.set_font(block.font);
    ctx.set_text_align(TextAlign::Left);
    ctx.set_text_baseline(TextBaseline::Top);
    ctx.set_fill_style(FillStyle::Solid(block.color));
    ctx.set_text_wrap(true);

    let wrapped = get_lines(&*ctx, block.text, block.max_width, block.max_lines);
    tracing::debug!(lines = ?wrapped, "wrapped text block");

    let mut last_y = block.y;
    let mut lines = Vec::with_capacity(wrapped.len());
    for (i, line) in wrapped.into_iter().enumerate() {
        last_y = block.y + i as f64 * block.line_height;
        ctx.fill_text(&line, block.x, last_y)?;
        lines.push(PlacedLine {
            text: line,
            x: block.x,
            y: last_y,
        });
    }

    Ok(TextLayout {
        lines,
        used_height: last_y + block.line_height,
    })
}
