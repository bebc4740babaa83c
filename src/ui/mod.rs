pub mod app;
pub mod dial;
