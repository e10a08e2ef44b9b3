use miette::Result;

use crate::{
    geometry::{Rect, Size},
    paint::FillStyle,
    text::{FontSpec, TextAlign, TextBaseline},
};

/// A decoded bitmap that can be drawn onto a [`DrawingContext`].
pub trait ImageSource {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
}

/// Canvas-2D-style drawing surface.
///
/// Font, alignment, baseline, fill and wrap are sticky state read by the
/// operations that follow. Callers set whatever they depend on right before
/// drawing rather than assuming what an earlier caller left behind.
pub trait DrawingContext {
    type Image: ImageSource;

    fn canvas_size(&self) -> Size;

    fn set_font(&mut self, font: &FontSpec);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    fn set_fill_style(&mut self, style: FillStyle);
    /// when disabled, newlines in drawn text are rendered as spaces
    fn set_text_wrap(&mut self, wrap: bool);

    /// Width in pixels of `text` rendered with the current font.
    fn measure_text(&self, text: &str) -> f64;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()>;
    fn fill_rect(&mut self, rect: Rect) -> Result<()>;

    /// Draw the `src` part of `image` scaled into `dst`.
    fn draw_image(&mut self, image: &Self::Image, src: Rect, dst: Rect) -> Result<()>;
}
