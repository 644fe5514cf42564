//! Verification code renderer.
//!
//! Encodes the record's opaque verification payload as a QR code, draws it
//! into the surface's code canvas before any capture, and keeps a standalone
//! PNG copy for reuse.

use std::sync::Arc;

use image::{Rgba as Pixel, RgbaImage};
use qrcode::{Color as Module, QrCode};

use crate::rendering::dom::{ElementContent, Surface};
use crate::rendering::raster::{encode_png, fingerprint, png_data_url};
use crate::{Error, QrConfig, Result};

/// Element id of the canvas the code is drawn into.
pub const CODE_CANVAS_ID: &str = "qr-code";

/// Raster image of a rendered verification code.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCodeImage {
    pub image: Arc<RgbaImage>,
}

impl RenderedCodeImage {
    /// Standalone copy of the code as a PNG data URL.
    pub fn to_data_url(&self) -> Result<String> {
        Ok(png_data_url(&encode_png(&self.image)?))
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.image)
    }
}

/// Encode `payload` with a `margin`-module quiet zone, each module drawn as
/// an integer block of pixels. The image is `config.size` pixels square when
/// the modules fit, and grows past it otherwise so no module is dropped.
/// Deterministic: equal inputs give bit-identical pixels.
pub fn encode_code(payload: &str, config: &QrConfig) -> Result<RgbaImage> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| Error::CodeRender(e.to_string()))?;
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let total = modules + config.margin * 2;
    let scale = (config.size / total).max(1);
    let side = (total * scale).max(config.size);
    // centre the module grid when it does not fill `side`
    let offset = (side - total * scale) / 2;
    let fg = Pixel([config.foreground.0, config.foreground.1, config.foreground.2, config.foreground.3]);
    let bg = Pixel([config.background.0, config.background.1, config.background.2, config.background.3]);

    Ok(RgbaImage::from_fn(side, side, |x, y| {
        if x < offset || y < offset {
            return bg;
        }
        let mx = ((x - offset) / scale) as i64 - config.margin as i64;
        let my = ((y - offset) / scale) as i64 - config.margin as i64;
        if mx < 0 || my < 0 || mx >= modules as i64 || my >= modules as i64 {
            return bg;
        }
        match colors[(my as u32 * modules + mx as u32) as usize] {
            Module::Dark => fg,
            Module::Light => bg,
        }
    }))
}

/// Keeps the code canvas in sync with the current payload.
pub struct CodeRenderer {
    config: QrConfig,
    last: Option<(String, u64)>,
    published: Option<RenderedCodeImage>,
}

impl CodeRenderer {
    pub fn new(config: QrConfig) -> Self {
        Self { config, last: None, published: None }
    }

    /// The last successfully rendered image, if any.
    pub fn published(&self) -> Option<&RenderedCodeImage> {
        self.published.as_ref()
    }

    /// Render `payload` into the surface's code canvas.
    ///
    /// On failure the canvas is cleared so no stale code survives, and
    /// [`Error::CodeRender`] is returned. There is no automatic retry.
    pub fn render(&mut self, payload: &str, surface: &mut Surface) -> Result<RenderedCodeImage> {
        let generation = surface.generation;
        let canvas = surface
            .find_by_id_mut(CODE_CANVAS_ID)
            .ok_or_else(|| Error::CodeRender(format!("no #{} canvas on the surface", CODE_CANVAS_ID)))?;

        let encoded = match encode_code(payload, &self.config) {
            Ok(img) => Arc::new(img),
            Err(e) => {
                canvas.content = ElementContent::Canvas { bitmap: None };
                self.last = None;
                self.published = None;
                log::error!("verification code render failed: {}", e);
                return Err(e);
            }
        };

        canvas.content = ElementContent::Canvas { bitmap: Some(encoded.clone()) };
        let rendered = RenderedCodeImage { image: encoded };
        self.last = Some((payload.to_string(), generation));
        self.published = Some(rendered.clone());
        log::debug!("rendered verification code ({} bytes payload)", payload.len());
        Ok(rendered)
    }

    /// Re-render only when the payload changed or the canvas was remounted.
    pub fn sync(&mut self, payload: &str, surface: &mut Surface) -> Result<Option<RenderedCodeImage>> {
        let canvas_drawn = matches!(
            surface.find_by_id(CODE_CANVAS_ID).map(|c| &c.content),
            Some(ElementContent::Canvas { bitmap: Some(_) })
        );
        let up_to_date = self
            .last
            .as_ref()
            .map(|(p, g)| p == payload && *g == surface.generation)
            .unwrap_or(false);
        if up_to_date && canvas_drawn {
            return Ok(None);
        }
        self.render(payload, surface).map(Some)
    }
}
