use ab_glyph::FontVec;
use std::path::{Path, PathBuf};

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the explicit font if given, otherwise the first system font found.
///
/// An explicit path that cannot be loaded is not replaced by a system font.
pub fn load_font(explicit: Option<&Path>) -> Option<FontVec> {
    match explicit {
        Some(path) => read_font(path),
        None => SYSTEM_FONTS
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .find_map(|p| read_font(&p)),
    }
}

fn read_font(path: &Path) -> Option<FontVec> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "cannot read font");
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            tracing::debug!(path = %path.display(), "font loaded");
            Some(font)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "not a usable font");
            None
        }
    }
}
