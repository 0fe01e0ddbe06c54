use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use crate::builtin_font::PixelFont;
use crate::frames::load_pixmap;

const STUB_SIZE: u32 = 64;

/// Alias-to-raster mapping for medal icons. Registration of an unreadable
/// file is fatal; lookup of an unknown alias falls back to a generated
/// stub tile instead.
pub struct IconRegistry {
    icons: HashMap<String, Pixmap>,
    stub: Pixmap,
}

impl IconRegistry {
    pub fn new() -> Self {
        Self {
            icons: HashMap::new(),
            stub: build_stub_icon(),
        }
    }

    pub fn register(&mut self, alias: &str, path: &Path) -> Result<()> {
        if self.icons.contains_key(alias) {
            eprintln!("[brc] icon alias '{alias}' already taken, overwriting");
        }
        let icon = load_pixmap("icon", path)?;
        eprintln!("[brc] registered icon {} as '{alias}'", path.display());
        self.icons.insert(alias.to_owned(), icon);
        Ok(())
    }

    pub fn get(&self, alias: &str) -> &Pixmap {
        match self.icons.get(alias) {
            Some(icon) => icon,
            None => {
                eprintln!("[brc] unknown icon alias '{alias}', using stub icon");
                &self.stub
            }
        }
    }
}

impl Default for IconRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder tile: gray square with a darker inner panel and a question
/// mark from the builtin font.
fn build_stub_icon() -> Pixmap {
    let mut icon = Pixmap::new(STUB_SIZE, STUB_SIZE).expect("stub icon dimensions are fixed");

    let mut paint = Paint::default();
    paint.anti_alias = false;

    let full = Rect::from_xywh(0.0, 0.0, STUB_SIZE as f32, STUB_SIZE as f32)
        .expect("stub rect is valid");
    paint.set_color(Color::from_rgba8(90, 90, 90, 255));
    icon.fill_path(
        &PathBuilder::from_rect(full),
        &paint,
        FillRule::Winding,
        Transform::identity(),
        None,
    );

    if let Some(inner) = Rect::from_xywh(4.0, 4.0, (STUB_SIZE - 8) as f32, (STUB_SIZE - 8) as f32) {
        paint.set_color(Color::from_rgba8(140, 140, 140, 255));
        icon.fill_path(
            &PathBuilder::from_rect(inner),
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    let glyph = PixelFont::for_size(42.0);
    let glyph_w = (glyph.cell_advance() - glyph.scale()) as i32;
    let glyph_h = glyph.line_height() as i32;
    glyph.draw_line(
        &mut icon,
        (STUB_SIZE as i32 - glyph_w) / 2,
        (STUB_SIZE as i32 - glyph_h) / 2,
        "?",
        Color::from_rgba8(235, 235, 235, 255),
    );

    icon
}
