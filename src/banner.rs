use std::path::Path;

use anyhow::{anyhow, bail, Result};
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, Mask, Paint, Path as SkiaPath, PathBuilder,
    Pixmap, PixmapPaint, Rect, Transform,
};

use crate::font::FontRegistry;
use crate::frames::{alpha_bbox, FrameSequence};
use crate::geom::{Margins, Point};
use crate::icons::IconRegistry;

/// Cursor-driven banner compositor.
///
/// Owns the canvas frames, the cursor, and the font/icon registries. Every
/// draw operation renders one transient transparent layer and then
/// alpha-composites it onto every frame in source order, so a failed layer
/// render can never corrupt already-composited content. The cursor advances
/// from the *rendered* alpha bounding box of each layer, not from nominal
/// font metrics.
pub struct Banner {
    width: u32,
    height: u32,
    frames: Vec<Pixmap>,
    duration_ms: u32,
    cursor: Point,
    rtl_mode: bool,
    fonts: FontRegistry,
    icons: IconRegistry,
}

impl Banner {
    /// Opens a base raster (static or animated GIF) as the canvas.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_sequence(FrameSequence::open(path)?)
    }

    /// Builds a compositor over pre-decoded frames. All frames must share
    /// dimensions.
    pub fn from_frames(frames: Vec<Pixmap>, duration_ms: u32) -> Result<Self> {
        Self::from_sequence(FrameSequence {
            frames,
            duration_ms,
        })
    }

    fn from_sequence(sequence: FrameSequence) -> Result<Self> {
        let Some(first) = sequence.frames.first() else {
            bail!("banner requires at least one frame");
        };
        let width = first.width();
        let height = first.height();
        if sequence
            .frames
            .iter()
            .any(|frame| frame.width() != width || frame.height() != height)
        {
            bail!("all banner frames must share dimensions");
        }

        Ok(Self {
            width,
            height,
            frames: sequence.frames,
            duration_ms: sequence.duration_ms,
            cursor: Point::ORIGIN,
            rtl_mode: false,
            fonts: FontRegistry::new(),
            icons: IconRegistry::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Loads a scalable font and binds it to `alias`. Missing or unparsable
    /// files bind the builtin fallback instead of failing.
    pub fn register_font(&mut self, alias: &str, path: &Path, size: f32) {
        self.fonts.register(alias, path, size);
    }

    /// Loads an icon raster and binds it to `alias`. Unlike fonts, a missing
    /// or undecodable icon file is fatal to the registration.
    pub fn register_icon(&mut self, alias: &str, path: &Path) -> Result<()> {
        self.icons.register(alias, path)
    }

    /// Anchor text from the right canvas edge, growing leftward.
    pub fn set_rtl(&mut self, enabled: bool) {
        self.rtl_mode = enabled;
    }

    pub fn move_cursor(&mut self, dx: i32, dy: i32) {
        self.cursor.x += dx;
        self.cursor.y += dy;
    }

    /// Absolute repositioning; `None` leaves that axis unchanged.
    pub fn set_cursor(&mut self, x: Option<i32>, y: Option<i32>) {
        if let Some(x) = x {
            self.cursor.x = x;
        }
        if let Some(y) = y {
            self.cursor.y = y;
        }
    }

    /// Renders `text` at the cursor offset by `margins`. With a mask, a
    /// second pass in `accent` is clipped to the mask's non-transparent
    /// bounding box and composited over the primary pass. The cursor
    /// advances to the rendered bounding box's right/bottom edge plus the
    /// trailing margins.
    pub fn draw_text(
        &mut self,
        text: &str,
        font_alias: &str,
        margins: Margins,
        primary: Color,
        accent: Option<Color>,
        mask: Option<&Pixmap>,
    ) -> Result<()> {
        let mut layer = self.new_layer()?;
        let mut ink = self.new_layer()?;
        let mut accent_ink = match mask {
            Some(_) => Some(self.new_layer()?),
            None => None,
        };

        let accent_color = accent.unwrap_or(primary);
        {
            let font = self.fonts.get_mut(font_alias);
            font.draw_line(&mut ink, 0, 0, text, primary);
            if let Some(accent_layer) = accent_ink.as_mut() {
                font.draw_line(accent_layer, 0, 0, text, accent_color);
            }
        }

        // Nothing rendered (empty or all-whitespace run): cursor unchanged.
        let Some((_, _, ink_right, _)) = alpha_bbox(&ink) else {
            return Ok(());
        };

        let anchor_x = if self.rtl_mode {
            self.width as i32 - margins.right - ink_right as i32
        } else {
            self.cursor.x + margins.left
        };
        let anchor_y = self.cursor.y + margins.top;

        layer.draw_pixmap(
            anchor_x,
            anchor_y,
            ink.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        if let (Some(mask_pixmap), Some(accent_layer)) = (mask, accent_ink.as_ref()) {
            if let Some((left, top, right, bottom)) = alpha_bbox(mask_pixmap) {
                let clip = self.rect_mask(left, top, right, bottom)?;
                layer.draw_pixmap(
                    anchor_x,
                    anchor_y,
                    accent_layer.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    Some(&clip),
                );
            }
        }

        if let Some((_, _, right, bottom)) = alpha_bbox(&layer) {
            self.cursor = Point::new(
                right as i32 + margins.right,
                bottom as i32 + margins.bottom,
            );
        }
        self.composite(&layer);
        Ok(())
    }

    /// Draws a rounded progress track inset `right_margin` from the right
    /// canvas edge at the cursor's y. `percent` is clamped to [0, 100]; the
    /// black ring outline is `outline_width` thick and degenerates to a
    /// solid bar when the inset would invert.
    pub fn draw_progress_bar(
        &mut self,
        percent: i32,
        length: u32,
        height: u32,
        right_margin: u32,
        outline_width: u32,
        fill: Color,
    ) -> Result<()> {
        if length == 0 || height == 0 {
            return Ok(());
        }
        let percent = percent.clamp(0, 100);

        let x0 = self.width as f32 - right_margin as f32 - length as f32;
        let y0 = self.cursor.y as f32;
        let x1 = self.width as f32 - right_margin as f32;
        let y1 = y0 + height as f32;
        let radius = height as f32 / 2.0;

        let track = rounded_rect_path(x0, y0, x1, y1, radius)
            .ok_or_else(|| anyhow!("degenerate progress track geometry"))?;

        let mut layer = self.new_layer()?;
        let mut paint = Paint::default();
        paint.anti_alias = false;

        let fill_right = x0 + length as f32 * percent as f32 / 100.0;
        if fill_right > x0 {
            let clip = self.rect_mask_f32(x0, y0, fill_right, y1)?;
            paint.set_color(fill);
            layer.fill_path(&track, &paint, FillRule::Winding, Transform::identity(), Some(&clip));
        }

        // Ring built on its own layer so clearing the inset cannot erase
        // the fill underneath.
        let mut ring = self.new_layer()?;
        paint.set_color(Color::from_rgba8(0, 0, 0, 255));
        ring.fill_path(&track, &paint, FillRule::Winding, Transform::identity(), None);

        let inset = outline_width as f32;
        let (ix0, iy0, ix1, iy1) = (x0 + inset, y0 + inset, x1 - inset, y1 - inset);
        if ix1 > ix0 && iy1 > iy0 {
            if let Some(inner) = rounded_rect_path(ix0, iy0, ix1, iy1, (iy1 - iy0) / 2.0) {
                let mut clear = Paint::default();
                clear.anti_alias = false;
                clear.blend_mode = BlendMode::Clear;
                ring.fill_path(&inner, &clear, FillRule::Winding, Transform::identity(), None);
            }
        }

        layer.draw_pixmap(
            0,
            0,
            ring.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        self.cursor = Point::new(x0 as i32, (y1 + height as f32) as i32);
        self.composite(&layer);
        Ok(())
    }

    /// Places a horizontal row of icons at the cursor, each downscaled to
    /// fit `max_dimension` square (never upscaled), each subsequent icon
    /// shifted left by `overlap_px`. Unknown aliases use the stub icon.
    /// The cursor does not move.
    pub fn draw_icon_row(
        &mut self,
        aliases: &[&str],
        max_dimension: u32,
        overlap_px: u32,
    ) -> Result<()> {
        if aliases.is_empty() || max_dimension == 0 {
            return Ok(());
        }

        let mut layer = self.new_layer()?;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };

        let mut offset_x = 0_i32;
        for alias in aliases {
            let icon = self.icons.get(alias);
            let scale = (max_dimension as f32 / icon.width() as f32)
                .min(max_dimension as f32 / icon.height() as f32)
                .min(1.0);
            let scaled_width = (icon.width() as f32 * scale).round() as i32;

            let transform = Transform::from_scale(scale, scale).post_translate(
                (self.cursor.x + offset_x) as f32,
                self.cursor.y as f32,
            );
            layer.draw_pixmap(0, 0, icon.as_ref(), &paint, transform, None);

            offset_x += scaled_width - overlap_px as i32;
        }

        self.composite(&layer);
        Ok(())
    }

    /// Returns the finished frame sequence plus duration. The compositor
    /// stays usable; cursor state is untouched.
    pub fn render(&self) -> FrameSequence {
        FrameSequence {
            frames: self.frames.clone(),
            duration_ms: self.duration_ms,
        }
    }

    fn new_layer(&self) -> Result<Pixmap> {
        Pixmap::new(self.width, self.height)
            .ok_or_else(|| anyhow!("canvas has zero dimension"))
    }

    fn composite(&mut self, layer: &Pixmap) {
        for frame in &mut self.frames {
            frame.draw_pixmap(
                0,
                0,
                layer.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
    }

    fn rect_mask(&self, left: u32, top: u32, right: u32, bottom: u32) -> Result<Mask> {
        self.rect_mask_f32(left as f32, top as f32, right as f32, bottom as f32)
    }

    fn rect_mask_f32(&self, left: f32, top: f32, right: f32, bottom: f32) -> Result<Mask> {
        let mut mask = Mask::new(self.width, self.height)
            .ok_or_else(|| anyhow!("canvas has zero dimension"))?;
        if let Some(rect) = Rect::from_ltrb(left, top, right, bottom) {
            mask.fill_path(
                &PathBuilder::from_rect(rect),
                FillRule::Winding,
                false,
                Transform::identity(),
            );
        }
        Ok(mask)
    }
}

/// Axis-aligned rounded rectangle with circular corner arcs approximated by
/// cubics. Radius is clamped to half the shorter side.
fn rounded_rect_path(x0: f32, y0: f32, x1: f32, y1: f32, radius: f32) -> Option<SkiaPath> {
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let r = radius.min((x1 - x0) / 2.0).min((y1 - y0) / 2.0).max(0.0);
    const K: f32 = 0.552_284_8;
    let k = r * (1.0 - K);

    let mut pb = PathBuilder::new();
    pb.move_to(x0 + r, y0);
    pb.line_to(x1 - r, y0);
    pb.cubic_to(x1 - k, y0, x1, y0 + k, x1, y0 + r);
    pb.line_to(x1, y1 - r);
    pb.cubic_to(x1, y1 - k, x1 - k, y1, x1 - r, y1);
    pb.line_to(x0 + r, y1);
    pb.cubic_to(x0 + k, y1, x0, y1 - k, x0, y1 - r);
    pb.line_to(x0, y0 + r);
    pb.cubic_to(x0, y0 + k, x0 + k, y0, x0 + r, y0);
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Color {
        Color::from_rgba8(255, 0, 0, 255)
    }

    fn blue() -> Color {
        Color::from_rgba8(0, 0, 255, 255)
    }

    fn blank_banner(width: u32, height: u32) -> Banner {
        let frame = Pixmap::new(width, height).unwrap();
        Banner::from_frames(vec![frame], 100).unwrap()
    }

    fn is_color(px: tiny_skia::PremultipliedColorU8, color: Color) -> bool {
        let c = px.demultiply();
        let want = color.to_color_u8();
        c.red() == want.red()
            && c.green() == want.green()
            && c.blue() == want.blue()
            && c.alpha() == want.alpha()
    }

    fn columns_with_color(banner: &Banner, color: Color) -> Vec<u32> {
        let frame = &banner.render().frames[0];
        let width = frame.width();
        let mut columns = Vec::new();
        for x in 0..width {
            let hit = (0..frame.height()).any(|y| {
                is_color(frame.pixels()[(y * width + x) as usize], color)
            });
            if hit {
                columns.push(x);
            }
        }
        columns
    }

    #[test]
    fn progress_fill_is_monotonic_and_bounded() {
        let mut previous = 0_usize;
        for percent in [0, 10, 25, 50, 75, 100] {
            let mut banner = blank_banner(800, 120);
            banner.set_cursor(None, Some(20));
            banner
                .draw_progress_bar(percent, 600, 40, 20, 4, red())
                .unwrap();

            let columns = columns_with_color(&banner, red());
            assert!(
                columns.len() >= previous,
                "fill width shrank between steps at {percent}%"
            );
            assert!(columns.len() <= 600, "fill exceeds the track length");
            for x in &columns {
                assert!(
                    *x >= 800 - 20 - 600 && *x < 800 - 20,
                    "fill column {x} escapes the track"
                );
            }
            previous = columns.len();
        }
    }

    #[test]
    fn out_of_range_percent_clamps_instead_of_failing() {
        let render_bar = |percent: i32| -> Vec<u8> {
            let mut banner = blank_banner(400, 80);
            banner.set_cursor(None, Some(10));
            banner
                .draw_progress_bar(percent, 300, 30, 10, 3, red())
                .unwrap();
            banner.render().frames[0].data().to_vec()
        };

        assert_eq!(render_bar(-10), render_bar(0));
        assert_eq!(render_bar(150), render_bar(100));
    }

    #[test]
    fn overwide_outline_degenerates_to_solid_bar() {
        let mut banner = blank_banner(400, 80);
        banner.set_cursor(None, Some(10));
        banner
            .draw_progress_bar(50, 300, 20, 10, 20, red())
            .unwrap();
        let frame = &banner.render().frames[0];
        assert!(frame.pixels().iter().any(|px| px.alpha() > 0));
    }

    #[test]
    fn text_modifies_only_region_past_the_anchor() {
        let mut banner = blank_banner(240, 60);
        banner.move_cursor(4, 2);
        banner
            .draw_text("Ay", "heading", Margins::new(10, 5, 0, 0), red(), None, None)
            .unwrap();

        let cursor = banner.cursor();
        let frame = &banner.render().frames[0];
        for (index, px) in frame.pixels().iter().enumerate() {
            if px.alpha() == 0 {
                continue;
            }
            let x = index as u32 % frame.width();
            let y = index as u32 / frame.width();
            assert!(x >= 14 && y >= 7, "pixel ({x},{y}) left of the anchor");
            assert!(
                (x as i32) < cursor.x && (y as i32) < cursor.y,
                "pixel ({x},{y}) outside the reported bounding box"
            );
        }
    }

    #[test]
    fn cursor_advance_tracks_rendered_extents_not_metrics() {
        let mut short = blank_banner(240, 60);
        short
            .draw_text("a", "body", Margins::NONE, red(), None, None)
            .unwrap();

        let mut tall = blank_banner(240, 60);
        tall.draw_text("Ay", "body", Margins::NONE, red(), None, None)
            .unwrap();

        // Lowercase "a" has no ascender and "y" hangs a descender below
        // the baseline, so the rendered box of "a" must be shorter than
        // that of "Ay" in both axes.
        assert!(short.cursor().y < tall.cursor().y);
        assert!(short.cursor().x < tall.cursor().x);
    }

    #[test]
    fn masked_accent_stays_inside_mask_bounds() {
        let mut mask = Pixmap::new(320, 40).unwrap();
        for y in 0..40 {
            for x in 0..100 {
                mask.pixels_mut()[(y * 320 + x) as usize] =
                    tiny_skia::PremultipliedColorU8::from_rgba(255, 255, 255, 255).unwrap();
            }
        }

        let mut banner = blank_banner(320, 40);
        banner
            .draw_text(
                "AAAA AAAA AAAA",
                "heading",
                Margins::NONE,
                red(),
                Some(blue()),
                Some(&mask),
            )
            .unwrap();

        let frame = &banner.render().frames[0];
        let mut saw_accent = false;
        let mut saw_primary = false;
        for (index, px) in frame.pixels().iter().enumerate() {
            if px.alpha() == 0 {
                continue;
            }
            let x = index as u32 % frame.width();
            if is_color(*px, blue()) {
                saw_accent = true;
                assert!(x < 100, "accent pixel at column {x} escaped the mask");
            } else {
                assert!(is_color(*px, red()));
                if x >= 100 {
                    saw_primary = true;
                }
            }
        }
        assert!(saw_accent && saw_primary);
    }

    #[test]
    fn rtl_text_anchors_at_right_edge() {
        let mut banner = blank_banner(300, 40);
        banner.set_rtl(true);
        banner
            .draw_text("AA", "heading", Margins::new(0, 0, 20, 0), red(), None, None)
            .unwrap();

        let frame = &banner.render().frames[0];
        let rightmost = (0..frame.width())
            .rev()
            .find(|x| {
                (0..frame.height())
                    .any(|y| frame.pixels()[(y * frame.width() + x) as usize].alpha() > 0)
            })
            .expect("text should render");
        assert_eq!(rightmost, 300 - 20 - 1);
    }

    #[test]
    fn unknown_icon_alias_draws_stub() {
        let mut banner = blank_banner(200, 100);
        banner.set_cursor(Some(10), Some(10));
        banner.draw_icon_row(&["missing-medal"], 64, 10).unwrap();

        let frame = &banner.render().frames[0];
        assert!(frame.pixels().iter().any(|px| px.alpha() > 0));
    }

    #[test]
    fn icon_row_overlap_shifts_subsequent_icons_left() {
        let mut single = blank_banner(400, 100);
        single.draw_icon_row(&["a"], 64, 16).unwrap();
        let single_cols = {
            let frame = &single.render().frames[0];
            (0..frame.width())
                .filter(|x| {
                    (0..frame.height())
                        .any(|y| frame.pixels()[(y * frame.width() + x) as usize].alpha() > 0)
                })
                .count()
        };

        let mut double = blank_banner(400, 100);
        double.draw_icon_row(&["a", "b"], 64, 16).unwrap();
        let double_cols = {
            let frame = &double.render().frames[0];
            (0..frame.width())
                .filter(|x| {
                    (0..frame.height())
                        .any(|y| frame.pixels()[(y * frame.width() + x) as usize].alpha() > 0)
                })
                .count()
        };

        // Two stub icons overlap by 16px: wider than one, narrower than two.
        assert!(double_cols > single_cols);
        assert!(double_cols < single_cols * 2);
    }

    #[test]
    fn set_cursor_leaves_unspecified_axis_alone() {
        let mut banner = blank_banner(100, 100);
        banner.set_cursor(Some(30), Some(40));
        banner.set_cursor(Some(5), None);
        assert_eq!(banner.cursor(), Point::new(5, 40));
        banner.set_cursor(None, Some(7));
        assert_eq!(banner.cursor(), Point::new(5, 7));
        banner.move_cursor(-10, 3);
        assert_eq!(banner.cursor(), Point::new(-5, 10));
    }

    #[test]
    fn draw_ops_apply_to_every_frame() {
        let frames = vec![Pixmap::new(120, 40).unwrap(), Pixmap::new(120, 40).unwrap()];
        let mut banner = Banner::from_frames(frames, 80).unwrap();
        banner
            .draw_text("Rank: 1", "body", Margins::NONE, red(), None, None)
            .unwrap();

        let rendered = banner.render();
        assert_eq!(rendered.duration_ms, 80);
        assert_eq!(rendered.frames[0].data(), rendered.frames[1].data());
        assert!(rendered.frames[0].pixels().iter().any(|px| px.alpha() > 0));
    }

    #[test]
    fn mismatched_frame_dimensions_are_rejected() {
        let frames = vec![Pixmap::new(10, 10).unwrap(), Pixmap::new(12, 10).unwrap()];
        assert!(Banner::from_frames(frames, 100).is_err());
    }
}
