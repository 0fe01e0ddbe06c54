use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::Font;
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

use crate::builtin_font::PixelFont;

/// Point size used when an alias was never registered and the builtin
/// fallback has to stand in.
pub const FALLBACK_FONT_SIZE: f32 = 14.0;

#[derive(Debug, Clone)]
struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

/// One registered font resource: either a parsed outline font rasterized
/// through fontdue, or the embedded pixel fallback.
pub enum BannerFont {
    Outline(OutlinePainter),
    Builtin(PixelFont),
}

impl BannerFont {
    pub fn is_builtin(&self) -> bool {
        matches!(self, BannerFont::Builtin(_))
    }

    /// Renders one line of text onto `layer` with the pen's top-left at
    /// (x, y). Measurement happens afterwards on the rendered alpha
    /// bounding box, never on nominal font metrics.
    pub fn draw_line(&mut self, layer: &mut Pixmap, x: i32, y: i32, text: &str, color: Color) {
        match self {
            BannerFont::Outline(painter) => painter.draw_line(layer, x, y, text, color),
            BannerFont::Builtin(font) => font.draw_line(layer, x, y, text, color),
        }
    }
}

pub struct OutlinePainter {
    font: Font,
    size: f32,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl OutlinePainter {
    fn new(font: Font, size: f32) -> Self {
        Self {
            font,
            size,
            glyph_cache: HashMap::new(),
        }
    }

    fn draw_line(&mut self, layer: &mut Pixmap, x: i32, y: i32, text: &str, color: Color) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: x as f32,
            y: y as f32,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.size, 0));

        let rgba = color.to_color_u8();
        let straight = [rgba.red(), rgba.green(), rgba.blue(), rgba.alpha()];

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let glyph_bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, bitmap) = self.font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    bitmap,
                }
            });

            blend_glyph(
                layer,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                glyph_bitmap,
                straight,
            );
        }
    }
}

/// Alias-to-font mapping, populated before drawing begins. Lookups never
/// fail: unknown aliases and unreadable font files resolve to the builtin
/// fallback with a warning.
pub struct FontRegistry {
    fonts: HashMap<String, BannerFont>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
        }
    }

    pub fn register(&mut self, alias: &str, path: &Path, size: f32) {
        if self.fonts.contains_key(alias) {
            eprintln!("[brc] font alias '{alias}' already taken, overwriting");
        }

        let font = match fs::read(path) {
            Ok(bytes) => match Font::from_bytes(bytes, fontdue::FontSettings::default()) {
                Ok(font) => {
                    eprintln!(
                        "[brc] registered font {} as '{alias}' ({size}pt)",
                        path.display()
                    );
                    BannerFont::Outline(OutlinePainter::new(font, size))
                }
                Err(error) => {
                    eprintln!(
                        "[brc] failed to parse font {} for '{alias}': {error}, using builtin fallback",
                        path.display()
                    );
                    BannerFont::Builtin(PixelFont::for_size(size))
                }
            },
            Err(error) => {
                eprintln!(
                    "[brc] failed to read font {} for '{alias}': {error}, using builtin fallback",
                    path.display()
                );
                BannerFont::Builtin(PixelFont::for_size(size))
            }
        };

        self.fonts.insert(alias.to_owned(), font);
    }

    pub fn get_mut(&mut self, alias: &str) -> &mut BannerFont {
        if !self.fonts.contains_key(alias) {
            eprintln!("[brc] font alias '{alias}' not registered, using builtin fallback");
            self.fonts.insert(
                alias.to_owned(),
                BannerFont::Builtin(PixelFont::for_size(FALLBACK_FONT_SIZE)),
            );
        }
        self.fonts
            .get_mut(alias)
            .expect("alias inserted above must exist")
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Source-over blend of a coverage bitmap into a premultiplied pixmap.
fn blend_glyph(layer: &mut Pixmap, x: i32, y: i32, glyph: &GlyphBitmap, color: [u8; 4]) {
    let layer_width = layer.width() as i32;
    let layer_height = layer.height() as i32;
    let pixels = layer.pixels_mut();

    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= layer_height {
            continue;
        }

        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= layer_width {
                continue;
            }

            let coverage = glyph.bitmap[row * glyph.width + col];
            if coverage == 0 {
                continue;
            }

            let src_a = (u16::from(coverage) * u16::from(color[3]) / 255) as u8;
            if src_a == 0 {
                continue;
            }
            let premul = |channel: u8| (u16::from(channel) * u16::from(src_a) / 255) as u8;
            let src = [premul(color[0]), premul(color[1]), premul(color[2]), src_a];

            let idx = (py * layer_width + px) as usize;
            let dst = pixels[idx];
            let inv = 255 - u16::from(src_a);
            let over = |s: u8, d: u8| ((u16::from(s) * 255 + u16::from(d) * inv) / 255) as u8;

            let out_a = over(src[3], dst.alpha());
            let out = PremultipliedColorU8::from_rgba(
                over(src[0], dst.red()).min(out_a),
                over(src[1], dst.green()).min(out_a),
                over(src[2], dst.blue()).min(out_a),
                out_a,
            );
            if let Some(out) = out {
                pixels[idx] = out;
            }
        }
    }
}
