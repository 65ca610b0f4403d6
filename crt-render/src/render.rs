use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, bail};
use crt_core::{Circle, Frame, Palette, Rgba, TextOverlay};
use crt_timing::Timer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use string_cache::DefaultAtom as Atom;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Transform,
};

const TEXT_SIZE_PX: f32 = 24.0;

struct TextCache {
    font: FontVec,
    size_px: f32,
    color: Color,
    map: HashMap<Atom, Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontVec, size_px: f32, color: Color) -> Self {
        Self {
            font,
            size_px,
            color,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, text: &str) -> Option<Arc<Pixmap>> {
        let atom = Atom::from(text);
        if let Some(p) = self.map.get(&atom) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(text, self.size_px, &self.font, self.color)?);
        self.map.insert(atom, Arc::clone(&pm));
        Some(pm)
    }
}

/// Rasterizes one line of text into a tight, transparent, premultiplied pixmap.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with the baseline at the ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        return None;
    }

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    let cu = color.to_color_u8();
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i64;
            let iy = (y as f32 + b.min.y - min_y).floor() as i64;
            if ix < 0 || iy < 0 || ix >= w as i64 || iy >= h as i64 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            let inv = 1.0 - a;
            let bg = dst[i];
            // source over, premultiplied
            let blend = |s: u8, d: u8| ((s as f32 * a) as u8).saturating_add((d as f32 * inv) as u8);
            let r = blend(cu.red(), bg.red());
            let g = blend(cu.green(), bg.green());
            let bl = blend(cu.blue(), bg.blue());
            let al = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            if let Some(px) = PremultipliedColorU8::from_rgba(r.min(al), g.min(al), bl.min(al), al) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Per-frame timing breakdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub cached_texts: usize,
}

/// Software renderer: draws a [`Frame`] into an offscreen canvas, then copies
/// it into the RGBA frame buffer handed over by the presenter.
pub struct SkiaRenderer {
    palette: Palette,
    canvas: Pixmap,
    text: Option<TextCache>,
    warned_no_font: bool,
}

fn color(rgba: Rgba) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, palette: Palette, font: Option<FontVec>) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .with_context(|| format!("cannot allocate {width}x{height} canvas"))?;
        let text = font.map(|f| TextCache::new(f, TEXT_SIZE_PX, color(palette.text)));
        Ok(Self {
            palette,
            canvas,
            text,
            warned_no_font: false,
        })
    }

    pub fn has_font(&self) -> bool {
        self.text.is_some()
    }

    pub fn render_frame<T: Timer>(
        &mut self,
        frame: &Frame,
        frame_buffer: &mut [u8],
        timer: &T,
    ) -> Result<FrameStats> {
        let expected = self.canvas.data().len();
        if frame_buffer.len() != expected {
            bail!(
                "frame buffer is {} bytes, canvas needs {expected}",
                frame_buffer.len()
            );
        }

        let t = timer.now();
        self.canvas.fill(color(self.palette.background));
        if let Some(home) = &frame.home {
            self.draw_circle(home);
        }
        for target in &frame.targets {
            self.draw_circle(target);
        }
        for text in &frame.texts {
            self.draw_text(text);
        }
        let draw = timer.elapsed(t);

        let t = timer.now();
        frame_buffer.copy_from_slice(self.canvas.data());
        let copy = timer.elapsed(t);

        Ok(FrameStats {
            draw,
            copy,
            total: draw + copy,
            cached_texts: self.text.as_ref().map_or(0, |c| c.map.len()),
        })
    }

    fn draw_circle(&mut self, circle: &Circle) {
        let Some(path) = PathBuilder::from_circle(circle.center.x, circle.center.y, circle.radius)
        else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(color(circle.color));
        paint.anti_alias = true;
        self.canvas.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn draw_text(&mut self, overlay: &TextOverlay) {
        let Some(cache) = self.text.as_mut() else {
            if !self.warned_no_font {
                tracing::warn!("no font loaded, text overlays are not drawn");
                self.warned_no_font = true;
            }
            return;
        };
        let Some(pm) = cache.get_or_render(&overlay.content) else {
            return;
        };
        let x = (overlay.anchor.x - pm.width() as f32 * 0.5).round() as i32;
        let y = overlay.anchor.y.round() as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            Pixmap::as_ref(&pm),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}
