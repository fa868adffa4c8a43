pub mod app;
pub mod keymap;
pub mod logging;
pub mod render;
pub mod views;
