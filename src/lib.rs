//! certshot: certificate rendering and export
//!
//! Renders an achievement certificate from query-string data and exports the
//! rendered surface as a PNG for download, printing or native sharing.
//!
//! # Features
//!
//! - **Data loading**: ten required query keys, percent-decoded, all or nothing
//! - **Verification code**: the opaque payload drawn as a QR code inside the
//!   surface before capture
//! - **Capture**: unclipped, colour-sanitized, 2x supersampled rasterization
//!   with guaranteed flag restoration
//! - **Host traits**: file save, print window, share sheet and notices are
//!   supplied by the embedding host
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use certshot::{CertificatePage, ExportConfig};
//! use certshot::platform::{MemoryAssets, RecordingPlatform};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let platform = Arc::new(RecordingPlatform::new());
//! let page = CertificatePage::load(
//!     "id=1&date=2024-01-01&expiryDate=2026-01-01&registrationNumber=REG-001\
//!      &fullName=Jane+Doe&emailAddress=jane%40example.com&courseCompleted=Rust\
//!      &levelCompleted=Advanced&signature=sig.png&qrCode=verify%3AREG-001",
//!     ExportConfig::default(),
//!     platform.clone(),
//!     Arc::new(MemoryAssets::new()),
//! );
//! if let Some(exporter) = page.exporter() {
//!     exporter.download().await;
//! }
//! # }
//! ```

use serde::Deserialize;

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod certificate;
pub mod export;
pub mod page;
pub mod platform;
pub mod qr;
pub mod record;
pub mod rendering;
pub mod sanitize;

pub use capture::{Capturer, CaptureForm, ExportArtifact, ExportState, StateSnapshot, SurfaceSlot};
pub use export::{ExportOutcome, Exporter};
pub use page::CertificatePage;
pub use qr::{CodeRenderer, RenderedCodeImage};
pub use record::CertificateRecord;
pub use rendering::color::Rgba;
pub use sanitize::ColorFallback;

/// Configuration for rendering and export
///
/// Defaults match the reference behaviour: a 1000x700 surface, 2x
/// supersampling, a 100ms settle delay and a 90 unit QR code with a one
/// module quiet zone.
///
/// # Examples
///
/// ```
/// let cfg = certshot::ExportConfig::default();
/// assert_eq!(cfg.pixel_ratio, 2.0);
/// assert_eq!(cfg.qr.size, 90);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Layout size of the certificate surface
    pub viewport: Viewport,
    /// Supersampling factor applied to captures
    pub pixel_ratio: f32,
    /// Delay between relaxing clipping and rasterizing, in milliseconds.
    /// Zero yields once instead of sleeping.
    pub settle_delay_ms: u64,
    /// Verification code geometry and colours
    pub qr: QrConfig,
    /// Replacement strategy for unsupported colour encodings
    pub color_fallback: ColorFallback,
    /// Title passed to the native share sheet
    pub share_title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            pixel_ratio: 2.0,
            settle_delay_ms: 100,
            qr: QrConfig::default(),
            color_fallback: ColorFallback::Black,
            share_title: "Certificate of Achievement".to_string(),
        }
    }
}

impl ExportConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: ExportConfig =
            serde_json::from_str(json).map_err(|e| Error::ConfigError(format!("invalid config JSON: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.pixel_ratio > 0.0 && self.pixel_ratio <= 8.0) {
            return Err(Error::ConfigError(format!("pixel_ratio must be in (0, 8], got {}", self.pixel_ratio)));
        }
        if self.qr.size < 21 {
            return Err(Error::ConfigError(format!("qr.size must be at least 21, got {}", self.qr.size)));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must be non-empty".into()));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 700,
        }
    }
}

/// Verification code geometry. Error correction is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Side length in layout units
    pub size: u32,
    /// Quiet zone in modules
    pub margin: u32,
    pub foreground: Rgba,
    pub background: Rgba,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            size: 90,
            margin: 1,
            foreground: Rgba::BLACK,
            background: Rgba::WHITE,
        }
    }
}
