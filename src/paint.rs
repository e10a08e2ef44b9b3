use std::{fmt, str::FromStr};

use miette::{miette, Context, IntoDiagnostic, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    context::DrawingContext,
    geometry::{Point, Rect},
};

/// An sRGB colour with straight (non-premultiplied) alpha, all channels in [0, 1].
///
/// Serialized as a CSS-style string: `#rgb`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(r, g, b)` or `rgba(r, g, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            a,
        )
    }
}

fn parse_hex(hex: &str) -> Result<Color> {
    let digits = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| miette!("invalid hex digit in colour #{hex}"))?;
    let color = match digits.as_slice() {
        [r, g, b] => Color::from_rgba8(r * 17, g * 17, b * 17, 1.0),
        [r1, r2, g1, g2, b1, b2] => Color::from_rgba8(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 1.0),
        [r1, r2, g1, g2, b1, b2, a1, a2] => Color::from_rgba8(
            r1 * 16 + r2,
            g1 * 16 + g2,
            b1 * 16 + b2,
            f64::from(a1 * 16 + a2) / 255.0,
        ),
        _ => return Err(miette!("colour #{hex} must have 3, 6 or 8 hex digits")),
    };
    Ok(color)
}

fn parse_function(name: &str, args: &str) -> Result<Color> {
    let parts = args
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid {name}() arguments: {args}"))?;
    let channel = |v: f64| v.clamp(0.0, 255.0) / 255.0;
    match (name, parts.as_slice()) {
        ("rgb", [r, g, b]) => Ok(Color::rgba(channel(*r), channel(*g), channel(*b), 1.0)),
        ("rgba", [r, g, b, a]) => Ok(Color::rgba(
            channel(*r),
            channel(*g),
            channel(*b),
            a.clamp(0.0, 1.0),
        )),
        _ => Err(miette!("{name}() takes {} arguments", if name == "rgb" { 3 } else { 4 })),
    }
}

impl FromStr for Color {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let (name, rest) = s
            .split_once('(')
            .ok_or_else(|| miette!("unrecognised colour {s:?}"))?;
        let args = rest
            .strip_suffix(')')
            .ok_or_else(|| miette!("unterminated colour function {s:?}"))?;
        parse_function(name.trim(), args)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(
            f,
            "rgba({}, {}, {}, {})",
            byte(self.r),
            byte(self.g),
            byte(self.b),
            self.a
        )
    }
}

impl TryFrom<String> for Color {
    type Error = miette::Report;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

impl JsonSchema for Color {
    fn schema_name() -> String {
        "Color".to_owned()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
}

impl ColorStop {
    pub fn new(offset: f64, color: Color) -> Self {
        Self { offset, color }
    }
}

/// A gradient along the line `start -> end`.
///
/// Stops are kept in insertion order. Offsets are not checked for range or
/// ordering; the drawing surface decides what malformed lists look like.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    pub fn add_color_stop(&mut self, offset: f64, color: Color) {
        self.stops.push(ColorStop::new(offset, color));
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillStyle {
    Solid(Color),
    Linear(LinearGradient),
}

impl Default for FillStyle {
    fn default() -> Self {
        FillStyle::Solid(Color::BLACK)
    }
}

/// Everything `draw_gradient` needs: the gradient line, its stops, and the
/// rectangle to fill. The rectangle is independent of the line.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientFill {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<ColorStop>,
    pub rect: Rect,
}

pub fn draw_gradient<C: DrawingContext>(ctx: &mut C, fill: &GradientFill) -> Result<()> {
    let mut gradient = LinearGradient::new(fill.start, fill.end);
    for stop in &fill.stops {
        gradient.add_color_stop(stop.offset, stop.color);
    }
    ctx.set_fill_style(FillStyle::Linear(gradient));
    ctx.fill_rect(fill.rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{Op, RecordingContext};

    #[test]
    fn parses_css_colours() {
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#000000".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!(
            "rgba(0, 0, 0, 0)".parse::<Color>().unwrap(),
            Color::TRANSPARENT
        );
        assert_eq!(
            "rgb(255, 0, 51)".parse::<Color>().unwrap(),
            Color::rgba(1.0, 0.0, 0.2, 1.0)
        );
        let translucent = "#ff000080".parse::<Color>().unwrap();
        assert_eq!(translucent.r, 1.0);
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_colours() {
        assert!("#ffff".parse::<Color>().is_err());
        assert!("#ggg".parse::<Color>().is_err());
        assert!("rgba(1, 2, 3)".parse::<Color>().is_err());
        assert!("rgb(1, 2, 3".parse::<Color>().is_err());
        assert!("white".parse::<Color>().is_err());
    }

    #[test]
    fn colour_serializes_as_string() {
        let json = serde_json::to_string(&Color::BLACK).unwrap();
        assert_eq!(json, r#""rgba(0, 0, 0, 1)""#);
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::BLACK);
    }

    #[test]
    fn gradient_keeps_stop_order() {
        let a = Color::rgba(1.0, 0.0, 0.0, 1.0);
        let b = Color::rgba(0.0, 0.0, 1.0, 0.5);
        let fill = GradientFill {
            start: Point::new(0.0, 100.0),
            end: Point::new(0.0, 0.0),
            stops: vec![ColorStop::new(0.0, a), ColorStop::new(1.0, b)],
            rect: Rect::new(0.0, 0.0, 50.0, 100.0),
        };
        let mut ctx = RecordingContext::new(50.0, 100.0);
        draw_gradient(&mut ctx, &fill).unwrap();

        let [Op::FillRect { rect, style }] = ctx.ops.as_slice() else {
            panic!("expected a single fill, got {:?}", ctx.ops);
        };
        assert_eq!(*rect, fill.rect);
        let FillStyle::Linear(gradient) = style else {
            panic!("expected a gradient fill, got {style:?}");
        };
        assert_eq!(gradient.start, fill.start);
        assert_eq!(gradient.end, fill.end);
        assert_eq!(gradient.stops(), &[ColorStop::new(0.0, a), ColorStop::new(1.0, b)]);
    }

    #[test]
    fn malformed_stops_are_passed_through() {
        let fill = GradientFill {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
            stops: vec![
                ColorStop::new(0.9, Color::WHITE),
                ColorStop::new(-1.0, Color::BLACK),
                ColorStop::new(0.9, Color::TRANSPARENT),
            ],
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        };
        let mut ctx = RecordingContext::new(10.0, 10.0);
        draw_gradient(&mut ctx, &fill).unwrap();
        let Some(Op::FillRect { style: FillStyle::Linear(gradient), .. }) = ctx.ops.first() else {
            panic!("expected a gradient fill");
        };
        assert_eq!(gradient.stops(), fill.stops.as_slice());
    }
}
