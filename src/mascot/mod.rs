pub mod app;
pub mod asset;
pub mod content;
pub mod drag;
pub mod widget;
