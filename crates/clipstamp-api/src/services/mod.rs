//! Service layer.

pub mod render;

pub use render::RenderService;
