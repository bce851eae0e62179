//! UI layer: App orchestrator, AppWindow trait, egui drawing surface, colours, and windows.

pub mod app;
pub mod colors;
pub mod painter;
pub mod window;
pub mod windows;
