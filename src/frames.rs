use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, Frame, ImageFormat, ImageReader, RgbaImage};
use tiny_skia::{ColorU8, Pixmap};

use crate::error::ResourceError;

/// Per-frame display duration when the source carries none.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// An ordered set of same-size RGBA frames plus one shared display duration.
/// Frame count and duration are fixed once loaded.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    pub frames: Vec<Pixmap>,
    pub duration_ms: u32,
}

impl FrameSequence {
    /// Opens a base raster. Multi-frame GIF inputs are fully extracted into
    /// memory; any other decodable raster becomes a single frame.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = ImageReader::open(path)
            .map_err(|error| ResourceError::new("base image", path, error.to_string()))?
            .with_guessed_format()
            .map_err(|error| ResourceError::new("base image", path, error.to_string()))?;

        if reader.format() == Some(ImageFormat::Gif) {
            return Self::open_gif(path);
        }

        let image = reader
            .decode()
            .map_err(|error| ResourceError::new("base image", path, error.to_string()))?
            .to_rgba8();
        let frame = rgba_to_pixmap(&image)?;
        eprintln!(
            "[brc] loaded {} as static raster ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );

        Ok(Self {
            frames: vec![frame],
            duration_ms: DEFAULT_FRAME_DURATION_MS,
        })
    }

    fn open_gif(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|error| ResourceError::new("base image", path, error.to_string()))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .map_err(|error| ResourceError::new("base image", path, error.to_string()))?;
        let raw_frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|error| ResourceError::new("base image", path, error.to_string()))?;
        if raw_frames.is_empty() {
            return Err(ResourceError::new("base image", path, "gif contains no frames").into());
        }

        let (numer, denom) = raw_frames[0].delay().numer_denom_ms();
        let duration_ms = if denom == 0 { 0 } else { numer / denom };
        let duration_ms = if duration_ms == 0 {
            DEFAULT_FRAME_DURATION_MS
        } else {
            duration_ms
        };

        let mut frames = Vec::with_capacity(raw_frames.len());
        for frame in raw_frames {
            frames.push(rgba_to_pixmap(frame.buffer())?);
        }
        eprintln!(
            "[brc] loaded {} as GIF (frames={}, duration={}ms)",
            path.display(),
            frames.len(),
            duration_ms
        );

        Ok(Self {
            frames,
            duration_ms,
        })
    }

    pub fn width(&self) -> u32 {
        self.frames.first().map_or(0, Pixmap::width)
    }

    pub fn height(&self) -> u32 {
        self.frames.first().map_or(0, Pixmap::height)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Writes every frame as an animated GIF with the original duration and
    /// the loop-forever flag set.
    pub fn save_gif(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut encoder = GifEncoder::new(file);
        encoder
            .set_repeat(Repeat::Infinite)
            .context("failed to set gif loop flag")?;

        for frame in &self.frames {
            let buffer = pixmap_to_rgba(frame);
            let delay = Delay::from_numer_denom_ms(self.duration_ms, 1);
            encoder
                .encode_frame(Frame::from_parts(buffer, 0, 0, delay))
                .with_context(|| format!("failed to encode gif frame to {}", path.display()))?;
        }
        Ok(())
    }

    /// Writes the first frame as a static PNG preview.
    pub fn save_preview(&self, path: &Path) -> Result<()> {
        let first = self
            .frames
            .first()
            .ok_or_else(|| anyhow!("no frames to preview"))?;
        pixmap_to_rgba(first)
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to write preview {}", path.display()))
    }
}

/// Decodes a single raster (icon or mask) into a premultiplied pixmap.
pub fn load_pixmap(kind: &'static str, path: &Path) -> Result<Pixmap> {
    let image = ImageReader::open(path)
        .map_err(|error| ResourceError::new(kind, path, error.to_string()))?
        .decode()
        .map_err(|error| ResourceError::new(kind, path, error.to_string()))?
        .to_rgba8();
    rgba_to_pixmap(&image)
}

pub fn rgba_to_pixmap(image: &RgbaImage) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())
        .ok_or_else(|| anyhow!("raster has zero dimension"))?;
    for (src, dst) in image.pixels().zip(pixmap.pixels_mut()) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Ok(pixmap)
}

pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (src, dst) in pixmap.pixels().iter().zip(image.pixels_mut()) {
        let color = src.demultiply();
        dst.0 = [color.red(), color.green(), color.blue(), color.alpha()];
    }
    image
}

/// Bounding box of all pixels with non-zero alpha: (left, top) inclusive,
/// (right, bottom) exclusive. `None` when the pixmap is fully transparent.
pub fn alpha_bbox(pixmap: &Pixmap) -> Option<(u32, u32, u32, u32)> {
    let width = pixmap.width();
    let mut left = u32::MAX;
    let mut top = u32::MAX;
    let mut right = 0_u32;
    let mut bottom = 0_u32;
    let mut seen = false;

    for (index, pixel) in pixmap.pixels().iter().enumerate() {
        if pixel.alpha() == 0 {
            continue;
        }
        let x = index as u32 % width;
        let y = index as u32 / width;
        left = left.min(x);
        top = top.min(y);
        right = right.max(x + 1);
        bottom = bottom.max(y + 1);
        seen = true;
    }

    seen.then_some((left, top, right, bottom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::PremultipliedColorU8;

    #[test]
    fn rgba_pixmap_roundtrip_preserves_channels() {
        let mut image = RgbaImage::new(2, 1);
        image.get_pixel_mut(0, 0).0 = [200, 100, 50, 255];
        image.get_pixel_mut(1, 0).0 = [0, 0, 0, 0];

        let pixmap = rgba_to_pixmap(&image).unwrap();
        let back = pixmap_to_rgba(&pixmap);
        assert_eq!(back.get_pixel(0, 0).0, [200, 100, 50, 255]);
        assert_eq!(back.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn alpha_bbox_finds_opaque_region() {
        let mut pixmap = Pixmap::new(8, 8).unwrap();
        assert_eq!(alpha_bbox(&pixmap), None);

        let idx = (3 * 8 + 2) as usize;
        pixmap.pixels_mut()[idx] = PremultipliedColorU8::from_rgba(0, 0, 0, 255).unwrap();
        let idx = (5 * 8 + 6) as usize;
        pixmap.pixels_mut()[idx] = PremultipliedColorU8::from_rgba(0, 0, 0, 255).unwrap();

        assert_eq!(alpha_bbox(&pixmap), Some((2, 3, 7, 6)));
    }
}
