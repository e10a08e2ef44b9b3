use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};

use crate::{
    canvas::{output_format, Canvas, Picture},
    config::{RenderConfig, TextStyle},
    context::DrawingContext,
    geometry::{draw_image_cover_in, Point, Rect},
    paint::{draw_gradient, Color, GradientFill},
    text::{write_text, TextBlock, TextLayout},
};

/// Where the two text blocks of a card ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub title: TextLayout,
    pub subtitle: TextLayout,
}

fn text_block<'a>(
    text: &'a str,
    style: &'a TextStyle,
    color: Color,
    canvas_width: f64,
    x: f64,
    y: f64,
) -> TextBlock<'a> {
    TextBlock {
        text,
        max_width: canvas_width * style.max_width_ratio,
        max_lines: style.max_lines,
        font: &style.font,
        line_height: style.line_height,
        color,
        x,
        y,
    }
}

/// Draw a full card: background image, bottom-up dark overlay, title, then
/// subtitle anchored below whatever the title used.
pub fn paint_preview<C: DrawingContext>(
    ctx: &mut C,
    config: &RenderConfig,
    image: &C::Image,
    title: &str,
    subtitle: &str,
) -> Result<CardLayout> {
    let size = ctx.canvas_size();
    let (width, height) = (size.width, size.height);

    draw_image_cover_in(ctx, image, Rect::from_size(size), config.image_offset)?;

    draw_gradient(
        ctx,
        &GradientFill {
            start: Point::new(width / 2.0, height),
            end: Point::new(width / 2.0, 0.0),
            stops: config.overlay_stops.clone(),
            rect: Rect::from_size(size),
        },
    )?;

    let x = width * config.margin_x_ratio;
    let title = write_text(
        ctx,
        &text_block(
            title,
            &config.title,
            config.text_color,
            width,
            x,
            height * config.title_y_ratio,
        ),
    )?;

    let subtitle = write_text(
        ctx,
        &text_block(
            subtitle,
            &config.subtitle,
            config.text_color,
            width,
            x,
            title.used_height + config.subtitle_gap,
        ),
    )?;

    Ok(CardLayout { title, subtitle })
}

/// Decode, draw and encode without touching the filesystem.
pub fn compose(
    config: &RenderConfig,
    size: [u32; 2],
    image_bytes: &[u8],
    title: &str,
    subtitle: &str,
    format: image::ImageFormat,
) -> Result<Vec<u8>> {
    let [width, height] = size;
    let canvas = Canvas::new(width, height)?;
    let picture = Picture::decode(image_bytes)?;
    {
        let mut ctx = canvas.context()?;
        let layout = paint_preview(&mut ctx, config, &picture, title, subtitle)?;
        tracing::debug!(
            title_lines = layout.title.lines.len(),
            used_height = layout.subtitle.used_height,
            "painted preview card"
        );
    }
    canvas.encode(format)
}

/// Render a preview card with the default layout and write it to `filepath`.
pub async fn render_preview_img(
    size: [u32; 2],
    imgpath: impl AsRef<Path>,
    title: &str,
    subtitle: &str,
    filepath: impl AsRef<Path>,
) -> Result<()> {
    render_preview_img_with(&RenderConfig::default(), size, imgpath, title, subtitle, filepath).await
}

#[tracing::instrument(skip_all, fields(size = ?size, out = %filepath.as_ref().display()))]
pub async fn render_preview_img_with(
    config: &RenderConfig,
    size: [u32; 2],
    imgpath: impl AsRef<Path>,
    title: &str,
    subtitle: &str,
    filepath: impl AsRef<Path>,
) -> Result<()> {
    let imgpath = imgpath.as_ref();
    let filepath = filepath.as_ref();
    let format = output_format(filepath)?;

    let image_bytes = tokio::fs::read(imgpath)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read source image {}", imgpath.display()))?;

    let encoded = compose(config, size, &image_bytes, title, subtitle, format)
        .wrap_err_with(|| format!("failed to render {}", imgpath.display()))?;

    tokio::fs::write(filepath, encoded)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", filepath.display()))?;

    tracing::info!("wrote preview card");
    Ok(())
}
