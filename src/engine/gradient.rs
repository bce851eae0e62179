//! Two-colour linear gradient used to shade heatmap cells.

use eframe::egui::Color32;

/// Blend `a` and `b` by `strength`: `0.0` gives pure `b`, `1.0` pure `a`.
///
/// Out-of-range strengths are clamped first; alpha is always opaque.
pub fn blend(strength: f64, a: Color32, b: Color32) -> Color32 {
    let p = if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    };
    let w = p * 2.0 - 1.0;
    let w1 = (w + 1.0) / 2.0;
    let w2 = 1.0 - w1;

    let mix = |ca: u8, cb: u8| (f64::from(ca) * w1 + f64::from(cb) * w2).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}
