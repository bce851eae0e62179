//! [`Surface`] and [`TextSurface`] on top of an `egui::Painter`.
//!
//! Paths are kept as polylines in chart coordinates (origin top-left of the
//! chart rect) and turned into egui shapes on `stroke`/`fill`.

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke};

use crate::render::{Surface, TextSurface};

const LABEL_FONT_SIZE: f32 = 11.0;

pub struct EguiSurface<'a> {
    painter: &'a Painter,
    origin: Pos2,
    fill: Color32,
    stroke: Color32,
    line_width: f32,
    subpaths: Vec<Vec<Pos2>>,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self {
            painter,
            origin,
            fill: Color32::WHITE,
            stroke: Color32::WHITE,
            line_width: 1.0,
            subpaths: Vec::new(),
        }
    }

    fn pos(&self, x: f64, y: f64) -> Pos2 {
        Pos2::new(self.origin.x + x as f32, self.origin.y + y as f32)
    }
}

impl Surface for EguiSurface<'_> {
    fn move_to(&mut self, x: f64, y: f64) {
        let p = self.pos(x, y);
        self.subpaths.push(vec![p]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let p = self.pos(x, y);
        match self.subpaths.last_mut() {
            Some(path) => path.push(p),
            None => self.subpaths.push(vec![p]),
        }
    }

    fn draw_arc(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, start_angle: f64, sweep_angle: f64) {
        let segments = (sweep_angle.abs() * rx.max(ry) / 2.0).ceil().clamp(8.0, 64.0) as usize;
        let points = (0..=segments)
            .map(|i| {
                let a = start_angle + sweep_angle * i as f64 / segments as f64;
                self.pos(cx + rx * a.cos(), cy + ry * a.sin())
            })
            .collect();
        self.subpaths.push(points);
    }

    fn fill_rectangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let rect = Rect::from_two_pos(self.pos(x1, y1), self.pos(x2, y2));
        self.painter.rect_filled(rect, 0.0, self.fill);
    }

    fn set_fill_color(&mut self, color: Color32) {
        self.fill = color;
    }

    fn set_stroke_color(&mut self, color: Color32) {
        self.stroke = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width as f32;
    }

    fn stroke(&mut self) {
        let stroke = Stroke::new(self.line_width, self.stroke);
        for path in self.subpaths.drain(..) {
            if path.len() >= 2 {
                self.painter.add(Shape::line(path, stroke));
            }
        }
    }

    fn fill(&mut self) {
        for path in self.subpaths.drain(..) {
            if path.len() >= 3 {
                self.painter
                    .add(Shape::convex_polygon(path, self.fill, Stroke::NONE));
            }
        }
    }
}

impl TextSurface for EguiSurface<'_> {
    fn draw_text(&mut self, x: f64, y: f64, text: &str, color: Color32) {
        self.painter.text(
            self.pos(x, y),
            Align2::LEFT_TOP,
            text,
            FontId::monospace(LABEL_FONT_SIZE),
            color,
        );
    }
}

