//! Drawing surface abstraction plus recording and SVG implementations

use std::fmt::Write as _;

/// RGBA color with alpha in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// CSS color string (`#rrggbb` when opaque)
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    /// Round caps and joins
    pub round: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

/// Minimal 2D drawing surface
pub trait Canvas {
    /// Erase everything and set the logical surface size
    fn clear(&mut self, width: f64, height: f64);

    fn stroke_polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke);

    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &Stroke) {
        self.stroke_polyline(&[from, to], stroke);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle);

    /// Rendered width of `text`; defaults to an average-glyph estimate
    fn measure_text(&self, text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * 0.55
    }
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: Stroke,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        style: TextStyle,
    },
}

/// Canvas that keeps the commands of the current frame
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Text of every `Text` command, in draw order
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self, width: f64, height: f64) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear { width, height });
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            stroke: *stroke,
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            style: *style,
        });
    }
}

/// Canvas that renders into a standalone SVG document
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    font_family: String,
    body: String,
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            font_family: "Arial".to_string(),
            body: String::new(),
        }
    }

    /// The complete document, with a dark background so white strokes are visible
    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"#000000\"/>\n{body}</svg>\n",
            w = fmt_num(self.width),
            h = fmt_num(self.height),
            body = self.body
        )
    }
}

impl Default for SvgCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for SvgCanvas {
    fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.body.clear();
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        let coords: Vec<String> = points
            .iter()
            .map(|&(x, y)| format!("{},{}", fmt_num(x), fmt_num(y)))
            .collect();
        let cap = if stroke.round { "round" } else { "butt" };
        let _ = writeln!(
            self.body,
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"{}\" stroke-linejoin=\"{}\"/>",
            coords.join(" "),
            stroke.color.to_css(),
            fmt_num(stroke.width),
            cap,
            if stroke.round { "round" } else { "miter" }
        );
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let _ = writeln!(
            self.body,
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
            fmt_num(x),
            fmt_num(y),
            fmt_num(width),
            fmt_num(height),
            color.to_css()
        );
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        let anchor = match style.align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let baseline = match style.baseline {
            TextBaseline::Top => "hanging",
            TextBaseline::Middle => "middle",
        };
        let _ = writeln!(
            self.body,
            "<text x=\"{}\" y=\"{}\" fill=\"{}\" font-size=\"{}\" font-family=\"{}\" text-anchor=\"{}\" dominant-baseline=\"{}\">{}</text>",
            fmt_num(x),
            fmt_num(y),
            style.color.to_css(),
            fmt_num(style.size),
            self.font_family,
            anchor,
            baseline,
            escape(text)
        );
    }
}

fn fmt_num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
