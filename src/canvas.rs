use std::{io::Cursor, path::Path};

use cairo::{Format, ImageSurface};
use custom_debug::Debug;
use image::{DynamicImage, ImageFormat, RgbaImage};
use miette::{miette, Context, IntoDiagnostic, Result};

use crate::{
    context::{DrawingContext, ImageSource},
    geometry::{Rect, Size},
    paint::{Color, FillStyle, LinearGradient},
    text::{FontSpec, TextAlign, TextBaseline},
};

fn dimension(value: u32) -> Result<i32> {
    i32::try_from(value)
        .into_diagnostic()
        .wrap_err_with(|| format!("dimension {value} is too large for a cairo surface"))
}

/// Pick the encoding for `path` from its extension.
pub fn output_format(path: &Path) -> Result<ImageFormat> {
    ImageFormat::from_path(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot tell image format of {}", path.display()))
}

/// A decoded bitmap, stored the way cairo wants to sample it.
#[derive(Debug)]
pub struct Picture {
    #[debug(skip)]
    surface: ImageSurface,
    width: u32,
    height: u32,
}

impl Picture {
    /// Decode any format the `image` crate understands.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .into_diagnostic()
            .wrap_err("failed to decode source image")?;
        Self::from_rgba8(&decoded.to_rgba8())
    }

    pub fn from_rgba8(rgba: &RgbaImage) -> Result<Self> {
        let (width, height) = rgba.dimensions();
        let stride = Format::ARgb32
            .stride_for_width(width)
            .into_diagnostic()?;
        let row_len = usize::try_from(stride).into_diagnostic()?;

        let mut data = vec![0u8; row_len * height as usize];
        for (x, y, px) in rgba.enumerate_pixels() {
            let [r, g, b, a] = px.0;
            let offset = y as usize * row_len + x as usize * 4;
            data[offset..offset + 4].copy_from_slice(&premultiplied_argb(r, g, b, a).to_ne_bytes());
        }

        let surface = ImageSurface::create_for_data(
            data,
            Format::ARgb32,
            dimension(width)?,
            dimension(height)?,
            stride,
        )
        .into_diagnostic()
        .wrap_err("failed to create image surface")?;

        Ok(Self {
            surface,
            width,
            height,
        })
    }
}

impl ImageSource for Picture {
    fn width(&self) -> f64 {
        f64::from(self.width)
    }

    fn height(&self) -> f64 {
        f64::from(self.height)
    }
}

fn premultiplied_argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    let mul = |c: u8| (u32::from(c) * u32::from(a) + 127) / 255;
    (u32::from(a) << 24) | (mul(r) << 16) | (mul(g) << 8) | mul(b)
}

fn unpremultiplied_rgba(argb: u32) -> [u8; 4] {
    let a = (argb >> 24) & 0xff;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let div = |c: u32| ((c * 255 + a / 2) / a).min(255) as u8;
    [
        div((argb >> 16) & 0xff),
        div((argb >> 8) & 0xff),
        div(argb & 0xff),
        a as u8,
    ]
}

/// The pixel buffer a preview card is drawn into.
#[derive(Debug)]
pub struct Canvas {
    #[debug(skip)]
    surface: ImageSurface,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let surface = ImageSurface::create(Format::ARgb32, dimension(width)?, dimension(height)?)
            .into_diagnostic()
            .wrap_err("failed to create canvas")?;
        Ok(Self { surface })
    }

    pub fn width(&self) -> u32 {
        self.surface.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.surface.height() as u32
    }

    /// Contexts must be dropped before the canvas is encoded.
    pub fn context(&self) -> Result<CairoContext> {
        CairoContext::new(&self.surface)
    }

    pub fn to_rgba8(&mut self) -> Result<RgbaImage> {
        self.surface.flush();
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return Ok(RgbaImage::new(width, height));
        }
        let row_len = self.surface.stride() as usize;
        let data = self
            .surface
            .data()
            .into_diagnostic()
            .wrap_err("canvas is still in use by a drawing context")?;

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for row in data.chunks_exact(row_len).take(height as usize) {
            for px in row[..width as usize * 4].chunks_exact(4) {
                let argb = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
                rgba.extend_from_slice(&unpremultiplied_rgba(argb));
            }
        }
        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| miette!("canvas pixel buffer does not match its size"))
    }

    /// Encode the canvas. PNG is written by cairo, everything else by `image`.
    pub fn encode(mut self, format: ImageFormat) -> Result<Vec<u8>> {
        self.surface.flush();
        let mut out = Vec::new();
        if format == ImageFormat::Png {
            self.surface
                .write_to_png(&mut out)
                .into_diagnostic()
                .wrap_err("failed to encode png")?;
        } else {
            let rgba = DynamicImage::ImageRgba8(self.to_rgba8()?);
            let encodable = match format {
                ImageFormat::Jpeg => DynamicImage::ImageRgb8(rgba.to_rgb8()),
                _ => rgba,
            };
            encodable
                .write_to(&mut Cursor::new(&mut out), format)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to encode {format:?}"))?;
        }
        tracing::debug!(bytes = out.len(), ?format, "encoded canvas");
        Ok(out)
    }
}

pub fn cairo_gradient(gradient: &LinearGradient) -> cairo::LinearGradient {
    let pattern = cairo::LinearGradient::new(
        gradient.start.x,
        gradient.start.y,
        gradient.end.x,
        gradient.end.y,
    );
    for stop in gradient.stops() {
        let Color { r, g, b, a } = stop.color;
        pattern.add_color_stop_rgba(stop.offset, r, g, b, a);
    }
    pattern
}

fn pango_weight(weight: u16) -> pango::Weight {
    match weight {
        0..=149 => pango::Weight::Thin,
        150..=249 => pango::Weight::Ultralight,
        250..=324 => pango::Weight::Light,
        325..=364 => pango::Weight::Semilight,
        365..=389 => pango::Weight::Book,
        390..=449 => pango::Weight::Normal,
        450..=549 => pango::Weight::Medium,
        550..=649 => pango::Weight::Semibold,
        650..=749 => pango::Weight::Bold,
        750..=849 => pango::Weight::Ultrabold,
        850..=949 => pango::Weight::Heavy,
        _ => pango::Weight::Ultraheavy,
    }
}

fn font_description(font: &FontSpec) -> pango::FontDescription {
    let mut desc = pango::FontDescription::new();
    desc.set_family(&font.family);
    desc.set_weight(pango_weight(font.weight));
    desc.set_absolute_size(font.size * f64::from(pango::SCALE));
    desc
}

/// [`DrawingContext`] over a cairo surface, with text laid out by pango.
#[derive(Debug)]
pub struct CairoContext {
    #[debug(skip)]
    ctx: cairo::Context,
    size: Size,
    #[debug(format = "{}")]
    font: pango::FontDescription,
    align: TextAlign,
    baseline: TextBaseline,
    fill: FillStyle,
    wrap: bool,
}

impl CairoContext {
    pub fn new(surface: &ImageSurface) -> Result<Self> {
        let ctx = cairo::Context::new(surface).into_diagnostic()?;
        Ok(Self {
            ctx,
            size: Size::new(f64::from(surface.width()), f64::from(surface.height())),
            font: font_description(&FontSpec::new("sans-serif", 400, 10.0)),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
            fill: FillStyle::default(),
            wrap: false,
        })
    }

    fn layout(&self, text: &str) -> pango::Layout {
        let layout = pangocairo::create_layout(&self.ctx);
        layout.set_font_description(Some(&self.font));
        if self.wrap {
            layout.set_text(text);
        } else {
            layout.set_text(&text.replace('\n', " "));
        }
        layout
    }

    fn apply_fill(&self) -> Result<()> {
        match &self.fill {
            FillStyle::Solid(Color { r, g, b, a }) => self.ctx.set_source_rgba(*r, *g, *b, *a),
            FillStyle::Linear(gradient) => self
                .ctx
                .set_source(&cairo_gradient(gradient))
                .into_diagnostic()?,
        }
        Ok(())
    }
}

impl DrawingContext for CairoContext {
    type Image = Picture;

    fn canvas_size(&self) -> Size {
        self.size
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.font = font_description(font);
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.fill = style;
    }

    fn set_text_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    fn measure_text(&self, text: &str) -> f64 {
        let (_, logical) = self.layout(text).extents();
        pango::units_to_double(logical.width())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        let layout = self.layout(text);
        let (_, logical) = layout.extents();
        let width = pango::units_to_double(logical.width());
        let height = pango::units_to_double(logical.height());

        let dx = match self.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => -width / 2.0,
            TextAlign::Right => -width,
        };
        let dy = match self.baseline {
            TextBaseline::Top => 0.0,
            TextBaseline::Middle => -height / 2.0,
            TextBaseline::Alphabetic => -pango::units_to_double(layout.baseline()),
            TextBaseline::Bottom => -height,
        };

        self.apply_fill()?;
        self.ctx.new_path();
        self.ctx.move_to(x + dx, y + dy);
        pangocairo::layout_path(&self.ctx, &layout);
        self.ctx.fill().into_diagnostic()?;
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect) -> Result<()> {
        self.apply_fill()?;
        self.ctx.new_path();
        self.ctx.rectangle(rect.x, rect.y, rect.width, rect.height);
        self.ctx.fill().into_diagnostic()?;
        Ok(())
    }

    fn draw_image(&mut self, image: &Picture, src: Rect, dst: Rect) -> Result<()> {
        if src.is_degenerate() || dst.is_degenerate() {
            tracing::warn!(?src, ?dst, "nothing to draw for degenerate image rect");
            return Ok(());
        }

        self.ctx.save().into_diagnostic()?;
        self.ctx.new_path();
        self.ctx.rectangle(dst.x, dst.y, dst.width, dst.height);
        self.ctx.clip();
        self.ctx.translate(dst.x, dst.y);
        self.ctx.scale(dst.width / src.width, dst.height / src.height);
        self.ctx
            .set_source_surface(&image.surface, -src.x, -src.y)
            .into_diagnostic()?;
        let source = self.ctx.source();
        source.set_extend(cairo::Extend::Pad);
        source.set_filter(cairo::Filter::Good);
        self.ctx.paint().into_diagnostic()?;
        self.ctx.restore().into_diagnostic()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{draw_image_cover, Point},
        paint::{draw_gradient, ColorStop, GradientFill},
    };

    fn encode_png(rgba: RgbaImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn assert_pixel_near(actual: [u8; 4], expected: [u8; 4]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!(a.abs_diff(e) <= 2, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn gradient_stops_enumerate_in_order() {
        let mut gradient = LinearGradient::new(Point::new(600.0, 630.0), Point::new(600.0, 0.0));
        gradient.add_color_stop(0.0, Color::BLACK);
        gradient.add_color_stop(1.0, Color::rgba(0.2, 0.4, 0.6, 0.0));

        let pattern = cairo_gradient(&gradient);
        assert_eq!(pattern.color_stop_count().unwrap(), 2);
        assert_eq!(pattern.color_stop_rgba(0).unwrap(), (0.0, 0.0, 0.0, 0.0, 1.0));
        let (offset, r, g, b, a) = pattern.color_stop_rgba(1).unwrap();
        assert_eq!(offset, 1.0);
        assert!((r - 0.2).abs() < 1e-6 && (g - 0.4).abs() < 1e-6 && (b - 0.6).abs() < 1e-6);
        assert_eq!(a, 0.0);
    }

    #[test]
    fn decodes_source_dimensions() {
        let png = encode_png(RgbaImage::from_pixel(7, 3, image::Rgba([10, 20, 30, 255])));
        let picture = Picture::decode(&png).unwrap();
        assert_eq!((picture.width(), picture.height()), (7.0, 3.0));
    }

    #[test]
    fn rejects_undecodable_source() {
        assert!(Picture::decode(b"definitely not an image").is_err());
    }

    #[test]
    fn infers_output_format_from_extension() {
        assert_eq!(output_format(Path::new("out/card.png")).unwrap(), ImageFormat::Png);
        assert_eq!(output_format(Path::new("card.jpg")).unwrap(), ImageFormat::Jpeg);
        assert!(output_format(Path::new("card")).is_err());
        assert!(output_format(Path::new("card.txt")).is_err());
    }

    #[test]
    fn solid_fill_survives_png_encoding() {
        let canvas = Canvas::new(20, 10).unwrap();
        {
            let mut ctx = canvas.context().unwrap();
            ctx.set_fill_style(FillStyle::Solid(Color::rgba(1.0, 0.0, 0.0, 1.0)));
            ctx.fill_rect(Rect::new(0.0, 0.0, 20.0, 10.0)).unwrap();
        }
        let png = canvas.encode(ImageFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_pixel_near(decoded.get_pixel(13, 4).0, [255, 0, 0, 255]);
    }

    #[test]
    fn jpeg_output_drops_alpha() {
        let canvas = Canvas::new(16, 8).unwrap();
        let jpeg = canvas.encode(ImageFormat::Jpeg).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn cover_draw_fills_whole_canvas() {
        let source = RgbaImage::from_pixel(8, 4, image::Rgba([0, 0, 255, 255]));
        let picture = Picture::from_rgba8(&source).unwrap();
        let mut canvas = Canvas::new(6, 6).unwrap();
        {
            let mut ctx = canvas.context().unwrap();
            draw_image_cover(&mut ctx, &picture).unwrap();
        }
        let pixels = canvas.to_rgba8().unwrap();
        for px in pixels.pixels() {
            assert_pixel_near(px.0, [0, 0, 255, 255]);
        }
    }

    #[test]
    fn translucent_pixels_keep_their_colour() {
        let source = RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 128]));
        let picture = Picture::from_rgba8(&source).unwrap();
        let mut canvas = Canvas::new(1, 1).unwrap();
        {
            let mut ctx = canvas.context().unwrap();
            let full = Rect::new(0.0, 0.0, 1.0, 1.0);
            ctx.draw_image(&picture, full, full).unwrap();
        }
        assert_pixel_near(canvas.to_rgba8().unwrap().get_pixel(0, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn overlay_darkens_towards_the_bottom() {
        let mut canvas = Canvas::new(4, 100).unwrap();
        {
            let mut ctx = canvas.context().unwrap();
            ctx.set_fill_style(FillStyle::Solid(Color::WHITE));
            ctx.fill_rect(Rect::new(0.0, 0.0, 4.0, 100.0)).unwrap();
            draw_gradient(
                &mut ctx,
                &GradientFill {
                    start: Point::new(2.0, 100.0),
                    end: Point::new(2.0, 0.0),
                    stops: vec![
                        ColorStop::new(0.0, Color::BLACK),
                        ColorStop::new(1.0, Color::TRANSPARENT),
                    ],
                    rect: Rect::new(0.0, 0.0, 4.0, 100.0),
                },
            )
            .unwrap();
        }
        let pixels = canvas.to_rgba8().unwrap();
        let top = pixels.get_pixel(1, 0).0[0];
        let middle = pixels.get_pixel(1, 50).0[0];
        let bottom = pixels.get_pixel(1, 99).0[0];
        assert!(top > middle && middle > bottom, "{top} {middle} {bottom}");
    }

    #[test]
    fn degenerate_crop_draws_nothing() {
        let picture = Picture::from_rgba8(&RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]))).unwrap();
        let mut canvas = Canvas::new(3, 3).unwrap();
        {
            let mut ctx = canvas.context().unwrap();
            let dst = Rect::new(0.0, 0.0, 3.0, 3.0);
            ctx.draw_image(&picture, Rect::new(0.0, 0.0, f64::NAN, 2.0), dst).unwrap();
            ctx.draw_image(&picture, Rect::new(1.0, 1.0, 0.0, 1.0), dst).unwrap();
        }
        assert!(canvas.to_rgba8().unwrap().pixels().all(|px| px.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn text_measurement_grows_with_content() {
        let canvas = Canvas::new(200, 50).unwrap();
        let mut ctx = canvas.context().unwrap();
        ctx.set_font(&FontSpec::new("sans-serif", 400, 24.0));
        assert_eq!(ctx.measure_text(""), 0.0);
        assert!(ctx.measure_text("Hello World") >= ctx.measure_text("Hello"));
    }
}
