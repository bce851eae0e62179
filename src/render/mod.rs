//! Drawing pipeline: the backend-neutral surface contract and the renderers
//! that turn a [`SlotSeries`](crate::engine::series::SlotSeries) into
//! drawing calls.

pub mod heatmap;
pub mod overlay;

use eframe::egui::Color32;

/// Vector drawing target with a current path, fill colour and stroke style.
///
/// `stroke` and `fill` consume the current path.
pub trait Surface {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    /// Append an elliptical arc; angles are in radians.
    fn draw_arc(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, start_angle: f64, sweep_angle: f64);
    /// Fill an axis-aligned rectangle with the current fill colour.
    fn fill_rectangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn set_fill_color(&mut self, color: Color32);
    fn set_stroke_color(&mut self, color: Color32);
    fn set_line_width(&mut self, width: f64);
    fn stroke(&mut self);
    fn fill(&mut self);
}

/// Raster text output.
pub trait TextSurface {
    fn draw_text(&mut self, x: f64, y: f64, text: &str, color: Color32);
}

#[cfg(test)]
pub(crate) mod recorder {
    use super::*;

    /// A committed path segment.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Stroke {
        pub color: Color32,
        pub width: f64,
        pub points: Vec<(f64, f64)>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Arc {
        pub cx: f64,
        pub cy: f64,
        pub radius: f64,
        pub color: Color32,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Rect {
        pub x1: f64,
        pub y1: f64,
        pub x2: f64,
        pub y2: f64,
        pub color: Color32,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Text {
        pub x: f64,
        pub y: f64,
        pub text: String,
    }

    /// Surface that records primitives instead of drawing them.
    #[derive(Debug, Default)]
    pub struct Recorder {
        pub strokes: Vec<Stroke>,
        pub arcs: Vec<Arc>,
        pub rects: Vec<Rect>,
        pub texts: Vec<Text>,
        pub line_width: f64,
        fill: Color32,
        stroke: Color32,
        path: Vec<(f64, f64)>,
        pending_arcs: Vec<(f64, f64, f64)>,
    }

    impl Surface for Recorder {
        fn move_to(&mut self, x: f64, y: f64) {
            self.path.push((x, y));
        }

        fn line_to(&mut self, x: f64, y: f64) {
            self.path.push((x, y));
        }

        fn draw_arc(&mut self, cx: f64, cy: f64, rx: f64, _ry: f64, _start: f64, _sweep: f64) {
            self.pending_arcs.push((cx, cy, rx));
        }

        fn fill_rectangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
            self.rects.push(Rect {
                x1,
                y1,
                x2,
                y2,
                color: self.fill,
            });
        }

        fn set_fill_color(&mut self, color: Color32) {
            self.fill = color;
        }

        fn set_stroke_color(&mut self, color: Color32) {
            self.stroke = color;
        }

        fn set_line_width(&mut self, width: f64) {
            self.line_width = width;
        }

        fn stroke(&mut self) {
            if !self.path.is_empty() {
                self.strokes.push(Stroke {
                    color: self.stroke,
                    width: self.line_width,
                    points: std::mem::take(&mut self.path),
                });
            }
            self.pending_arcs.clear();
        }

        fn fill(&mut self) {
            for (cx, cy, radius) in self.pending_arcs.drain(..) {
                self.arcs.push(Arc {
                    cx,
                    cy,
                    radius,
                    color: self.fill,
                });
            }
            self.path.clear();
        }
    }

    impl TextSurface for Recorder {
        fn draw_text(&mut self, x: f64, y: f64, text: &str, _color: Color32) {
            self.texts.push(Text {
                x,
                y,
                text: text.to_owned(),
            });
        }
    }
}
