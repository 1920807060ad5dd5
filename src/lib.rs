// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod clipboard;
pub mod offsets;
pub mod reveal;
pub mod runtime;
pub mod settings;
pub mod text;
pub mod ui;
