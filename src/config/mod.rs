//! Configuration module

mod render;

pub use render::HighlightConfig;
pub use render::RenderConfig;
pub use render::UrlPrefix;
