use miette::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::{DrawingContext, ImageSource};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// true if the rect covers no pixels or has non-finite components
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width <= 0.0 || self.height <= 0.0
    }
}

/// Normalized anchor of the visible part of a cover-fitted image.
/// `(0, 0)` keeps the top-left corner, `(1, 1)` the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoverOffset {
    pub x: f64,
    pub y: f64,
}

impl CoverOffset {
    pub const CENTER: CoverOffset = CoverOffset { x: 0.5, y: 0.5 };

    /// keep both components within [0.0, 1.0]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

impl Default for CoverOffset {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Compute the part of a `source`-sized image that, scaled uniformly, exactly
/// fills `dest` (CSS `background-size: cover`).
///
/// The crop is positioned inside the source according to `offset`. Source
/// dimensions must be positive; zero dimensions yield a non-finite crop which
/// callers should treat as nothing to draw.
pub fn cover_crop(source: Size, dest: Size, offset: CoverOffset) -> Rect {
    let offset = offset.clamped();
    let (iw, ih) = (source.width, source.height);
    let (w, h) = (dest.width, dest.height);

    let r = (w / iw).min(h / ih);
    let mut nw = iw * r;
    let mut nh = ih * r;

    // decide which gap to fill
    let mut ar = 1.0;
    if nw < w {
        ar = w / nw;
    }
    if (ar - 1.0).abs() < 1e-14 && nh < h {
        ar = h / nh;
    }
    nw *= ar;
    nh *= ar;

    let mut cw = iw / (nw / w);
    let mut ch = ih / (nh / h);

    let mut cx = (iw - cw) * offset.x;
    let mut cy = (ih - ch) * offset.y;

    // floating point may overshoot the source bounds slightly
    if cx < 0.0 {
        cx = 0.0;
    }
    if cy < 0.0 {
        cy = 0.0;
    }
    if cw > iw {
        cw = iw;
    }
    if ch > ih {
        ch = ih;
    }

    Rect::new(cx, cy, cw, ch)
}

/// Draw `image` cover-fitted over the whole canvas, centered.
pub fn draw_image_cover<C: DrawingContext>(ctx: &mut C, image: &C::Image) -> Result<Rect> {
    let dest = Rect::from_size(ctx.canvas_size());
    draw_image_cover_in(ctx, image, dest, CoverOffset::CENTER)
}

/// Draw `image` cover-fitted into `dest`, returning the source crop used.
pub fn draw_image_cover_in<C: DrawingContext>(
    ctx: &mut C,
    image: &C::Image,
    dest: Rect,
    offset: CoverOffset,
) -> Result<Rect> {
    let source = Size::new(image.width(), image.height());
    let crop = cover_crop(source, dest.size(), offset);
    tracing::debug!(?source, ?dest, ?crop, "cover crop");
    ctx.draw_image(image, crop, dest)?;
    Ok(crop)
}
