//! Render link-preview cards: a cover-fitted background photo, a dark overlay
//! for contrast, and a wrapped title and subtitle on top.

pub mod canvas;
pub mod config;
pub mod context;
pub mod geometry;
pub mod paint;
pub mod render;
pub mod text;

pub use canvas::{Canvas, CairoContext, Picture};
pub use config::RenderConfig;
pub use context::{DrawingContext, ImageSource};
pub use geometry::{cover_crop, draw_image_cover, draw_image_cover_in};
pub use paint::draw_gradient;
pub use render::{paint_preview, render_preview_img, render_preview_img_with};
pub use text::{get_lines, write_text};
