//! Registered UI windows, each implementing `AppWindow`.

pub mod bookmap_view;
pub mod settings_view;
