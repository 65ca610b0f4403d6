use crate::geometry::Point;

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
    pub color: Rgba,
}

/// Text centered horizontally on `anchor.x` with its top edge at `anchor.y`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub content: String,
    pub anchor: Point,
}

/// Everything the renderer needs for one presentation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub home: Option<Circle>,
    pub targets: Vec<Circle>,
    pub texts: Vec<TextOverlay>,
}

impl Frame {
    pub fn push_text(&mut self, content: impl Into<String>, anchor: Point) {
        self.texts.push(TextOverlay {
            content: content.into(),
            anchor,
        });
    }

    /// Index of the first target drawn in `color`, if any.
    pub fn target_with_color(&self, color: Rgba) -> Option<usize> {
        self.targets.iter().position(|c| c.color == color)
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.content.contains(needle))
    }
}

/// Colors used when building frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Rgba,
    pub home: Rgba,
    pub target: Rgba,
    pub highlight: Rgba,
    pub text: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: [30, 30, 30, 255],
            home: [120, 120, 120, 255],
            target: [100, 100, 255, 255],
            highlight: [255, 0, 0, 255],
            text: [255, 255, 255, 255],
        }
    }
}
