//! Software rasterizer for capture surfaces.
//!
//! Paints the display list of a laid-out [`Surface`] into an RGBA buffer at a
//! supersampling factor. Colours in encodings it cannot read are skipped with
//! a warning, which is why captures sanitize the tree first.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba as Pixel, RgbaImage};
use sha2::{Digest, Sha256};

use crate::platform::AssetProvider;
use crate::rendering::color::{parse_color, ColorValue, Rgba};
use crate::rendering::dom::Surface;
use crate::rendering::layout::{layout_surface, Rect, CHAR_WIDTH, LINE_HEIGHT};
use crate::rendering::paint::{build_display_list, PaintCommand};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Output pixels per layout unit
    pub pixel_ratio: f32,
    /// Ignore decoded images cached by earlier passes
    pub cache_bust: bool,
    /// Honour `overflow: hidden`. Capture passes turn this off.
    pub clip: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { pixel_ratio: 1.0, cache_bust: false, clip: true }
    }
}

/// A rasterized surface.
#[derive(Debug, Clone)]
pub struct Raster {
    pub image: RgbaImage,
}

impl Raster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }

    pub fn to_data_url(&self) -> Result<String> {
        Ok(png_data_url(&self.to_png()?))
    }

    /// SHA-256 of the raw pixel buffer, hex encoded.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.image)
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::Encode(format!("PNG: {}", e)))?;
    Ok(buffer)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(png))
}

pub fn fingerprint(image: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_be_bytes());
    hasher.update(image.height().to_be_bytes());
    hasher.update(image.as_raw());
    hex::encode(hasher.finalize())
}

/// Rasterization backend used by captures.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, surface: &Surface, options: &RasterOptions) -> Result<Raster>;
}

/// The built-in rasterizer: block layout + display list + software paint.
pub struct SurfaceRasterizer {
    assets: Arc<dyn AssetProvider>,
    image_cache: Mutex<HashMap<String, Arc<RgbaImage>>>,
}

impl SurfaceRasterizer {
    pub fn new(assets: Arc<dyn AssetProvider>) -> Self {
        Self { assets, image_cache: Mutex::new(HashMap::new()) }
    }

    fn load_image(&self, src: &str, cache_bust: bool) -> Option<Arc<RgbaImage>> {
        if !cache_bust {
            if let Ok(cache) = self.image_cache.lock() {
                if let Some(img) = cache.get(src) {
                    return Some(img.clone());
                }
            }
        }
        let bytes = self.assets.fetch(src)?;
        let decoded = match image::load_from_memory(&bytes) {
            Ok(img) => Arc::new(img.to_rgba8()),
            Err(e) => {
                log::warn!("asset {} could not be decoded: {}", src, e);
                return None;
            }
        };
        if let Ok(mut cache) = self.image_cache.lock() {
            cache.insert(src.to_string(), decoded.clone());
        }
        Some(decoded)
    }
}

impl Rasterizer for SurfaceRasterizer {
    fn rasterize(&self, surface: &Surface, options: &RasterOptions) -> Result<Raster> {
        if options.pixel_ratio.is_nan() || options.pixel_ratio <= 0.0 {
            return Err(Error::Capture(format!("invalid pixel ratio {}", options.pixel_ratio)));
        }
        let tree = layout_surface(surface, options.clip);
        let bounds = tree.bounds;
        let scale = options.pixel_ratio;
        let width = (bounds.width as f32 * scale).ceil() as u32;
        let height = (bounds.height as f32 * scale).ceil() as u32;
        let mut canvas = Canvas {
            image: RgbaImage::new(width, height),
            origin: (bounds.x, bounds.y),
            scale,
        };

        for cmd in build_display_list(&tree) {
            match cmd {
                PaintCommand::SolidRect { rect, color, clip } => {
                    if let Some(c) = resolve(&color) {
                        canvas.fill(rect, clip, c);
                    }
                }
                PaintCommand::Border { rect, width, color, clip } => {
                    if let Some(c) = resolve(&color) {
                        let w = width.min(rect.width / 2).min(rect.height / 2);
                        let top = Rect { height: w, ..rect };
                        let bottom = Rect { y: rect.bottom() - w as i32, height: w, ..rect };
                        let left = Rect { width: w, ..rect };
                        let right = Rect { x: rect.right() - w as i32, width: w, ..rect };
                        for edge in [top, bottom, left, right] {
                            canvas.fill(edge, clip, c);
                        }
                    }
                }
                PaintCommand::Text { x, y, text, color, scale: s, clip } => {
                    let Some(c) = resolve(&color) else { continue };
                    for (row, line) in text.lines().enumerate() {
                        for (col, ch) in line.chars().enumerate() {
                            if ch.is_whitespace() {
                                continue;
                            }
                            let glyph = Rect {
                                x: x + (col as u32 * CHAR_WIDTH * s) as i32 + s as i32,
                                y: y + (row as u32 * LINE_HEIGHT * s) as i32 + s as i32,
                                width: (CHAR_WIDTH - 2) * s,
                                height: (LINE_HEIGHT - 2) * s,
                            };
                            canvas.fill(glyph, clip, c);
                        }
                    }
                }
                PaintCommand::Image { rect, src, clip } => match self.load_image(&src, options.cache_bust) {
                    Some(img) => canvas.draw(rect, clip, &img, FilterType::Triangle),
                    None => log::debug!("asset {} unavailable; leaving its box empty", src),
                },
                PaintCommand::Bitmap { rect, bitmap, clip } => canvas.draw(rect, clip, &bitmap, FilterType::Nearest),
            }
        }

        Ok(Raster { image: canvas.image })
    }
}

fn resolve(raw: &str) -> Option<Rgba> {
    match parse_color(raw) {
        ColorValue::Srgb(c) if c.3 > 0 => Some(c),
        ColorValue::Srgb(_) => None,
        ColorValue::Unsupported(space) => {
            log::warn!("cannot rasterize colour {} ({:?}); painting nothing", raw, space);
            None
        }
        ColorValue::Invalid => None,
    }
}

struct Canvas {
    image: RgbaImage,
    origin: (i32, i32),
    scale: f32,
}

impl Canvas {
    /// Map a layout rect (optionally clipped) to device pixel bounds.
    fn device(&self, rect: Rect, clip: Option<Rect>) -> Option<(u32, u32, u32, u32)> {
        let r = match clip {
            Some(c) => rect.intersect(&c),
            None => rect,
        };
        if r.width == 0 || r.height == 0 {
            return None;
        }
        let to_px = |v: i32, origin: i32| ((v - origin) as f32 * self.scale).round() as i64;
        let x0 = to_px(r.x, self.origin.0).clamp(0, self.image.width() as i64);
        let y0 = to_px(r.y, self.origin.1).clamp(0, self.image.height() as i64);
        let x1 = to_px(r.right(), self.origin.0).clamp(0, self.image.width() as i64);
        let y1 = to_px(r.bottom(), self.origin.1).clamp(0, self.image.height() as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn fill(&mut self, rect: Rect, clip: Option<Rect>, color: Rgba) {
        let Some((x0, y0, x1, y1)) = self.device(rect, clip) else { return };
        for y in y0..y1 {
            for x in x0..x1 {
                blend(self.image.get_pixel_mut(x, y), color);
            }
        }
    }

    /// Scale `src` onto `rect`, then copy the part inside `clip`.
    fn draw(&mut self, rect: Rect, clip: Option<Rect>, src: &RgbaImage, filter: FilterType) {
        let Some((full_x0, full_y0, full_x1, full_y1)) = self.device(rect, None) else { return };
        let Some((x0, y0, x1, y1)) = self.device(rect, clip) else { return };
        let scaled = imageops::resize(src, full_x1 - full_x0, full_y1 - full_y0, filter);
        for y in y0..y1 {
            for x in x0..x1 {
                let p = scaled.get_pixel(x - full_x0, y - full_y0);
                blend(self.image.get_pixel_mut(x, y), Rgba(p[0], p[1], p[2], p[3]));
            }
        }
    }
}

/// Source-over compositing on straight alpha.
fn blend(dst: &mut Pixel<u8>, src: Rgba) {
    let Rgba(sr, sg, sb, sa) = src;
    if sa == 255 {
        *dst = Pixel([sr, sg, sb, 255]);
        return;
    }
    if sa == 0 {
        return;
    }
    let a = sa as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = a + da * (1.0 - a);
    let mix = |s: u8, d: u8| -> u8 {
        ((s as f32 * a + d as f32 * da * (1.0 - a)) / out_a).round().clamp(0.0, 255.0) as u8
    };
    *dst = Pixel([mix(sr, dst[0]), mix(sg, dst[1]), mix(sb, dst[2]), (out_a * 255.0).round() as u8]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryAssets;
    use crate::Viewport;

    fn rasterizer() -> SurfaceRasterizer {
        SurfaceRasterizer::new(Arc::new(MemoryAssets::new()))
    }

    fn surface(html: &str) -> Surface {
        Surface::from_html(html, Viewport { width: 40, height: 20 }).unwrap()
    }

    #[test]
    fn paints_background_at_pixel_ratio() {
        let s = surface(r#"<div style="width: 40px; height: 20px; background-color: #ff0000"></div>"#);
        let raster = rasterizer()
            .rasterize(&s, &RasterOptions { pixel_ratio: 2.0, ..Default::default() })
            .unwrap();
        assert_eq!((raster.width(), raster.height()), (80, 40));
        assert_eq!(raster.image.get_pixel(79, 39).0, [255, 0, 0, 255]);
    }

    #[test]
    fn unsupported_colours_paint_nothing() {
        let s = surface(r#"<div style="width: 40px; height: 20px; background-color: oklch(0.6 0.2 30)"></div>"#);
        let raster = rasterizer().rasterize(&s, &RasterOptions::default()).unwrap();
        assert!(raster.image.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn png_output_has_signature() {
        let s = surface(r#"<div style="width: 4px; height: 4px; background-color: white"></div>"#);
        let raster = rasterizer().rasterize(&s, &RasterOptions::default()).unwrap();
        let png = raster.to_png().unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        assert!(raster.to_data_url().unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn images_come_from_assets_and_respect_cache_bust() {
        let assets = Arc::new(MemoryAssets::new());
        let blue = RgbaImage::from_pixel(2, 2, Pixel([0, 0, 255, 255]));
        assets.insert("logo.png", encode_png(&blue).unwrap());
        let r = SurfaceRasterizer::new(assets.clone());
        let s = surface(r#"<div style="width: 8px; height: 8px"><img src="logo.png" style="width: 8px; height: 8px"></div>"#);

        let first = r.rasterize(&s, &RasterOptions::default()).unwrap();
        assert_eq!(first.image.get_pixel(4, 4).0, [0, 0, 255, 255]);

        let red = RgbaImage::from_pixel(2, 2, Pixel([255, 0, 0, 255]));
        assets.insert("logo.png", encode_png(&red).unwrap());
        let cached = r.rasterize(&s, &RasterOptions::default()).unwrap();
        assert_eq!(cached.image.get_pixel(4, 4).0, [0, 0, 255, 255]);
        let busted = r.rasterize(&s, &RasterOptions { cache_bust: true, ..Default::default() }).unwrap();
        assert_eq!(busted.image.get_pixel(4, 4).0, [255, 0, 0, 255]);
    }

    #[test]
    fn blend_half_alpha_over_white() {
        let mut p = Pixel([255, 255, 255, 255]);
        blend(&mut p, Rgba(0, 0, 0, 128));
        assert_eq!(p.0[3], 255);
        assert!(p.0[0] > 120 && p.0[0] < 135);
    }
}
