pub mod font;
pub mod render;

pub use ab_glyph;
pub use font::load_font;
pub use render::{FrameStats, SkiaRenderer, render_text_pixmap};
