//! Capture primitive and its transient state.
//!
//! A capture relaxes clipping on the mounted surface, waits for layout to
//! settle, rasterizes a colour-sanitized snapshot at the configured
//! supersampling factor and then restores the surface. The `capturing` and
//! `loading` flags are only ever set through RAII guards, so they return to
//! `false` on every exit path, panics and `?` returns included.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::rendering::dom::Surface;
use crate::rendering::raster::{png_data_url, RasterOptions, Rasterizer};
use crate::sanitize::sanitize_tree;
use crate::{Error, ExportConfig, Result};

/// Observable export state: one flag per scope.
///
/// `loading` spans a whole export operation (controls disabled), `capturing`
/// spans a single rasterization pass (clipping relaxed). Each flag counts
/// its live guards and reads true while any is held, so overlapping passes
/// cannot clear each other. Cloning shares the flags.
#[derive(Debug, Clone, Default)]
pub struct ExportState {
    capturing: Arc<AtomicUsize>,
    loading: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub capturing: bool,
    pub loading: bool,
}

impl ExportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst) > 0
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot { capturing: self.is_capturing(), loading: self.is_loading() }
    }

    /// Enter `capturing`; the flag clears when the guard drops.
    pub fn begin_capture(&self) -> FlagGuard {
        FlagGuard::raise(self.capturing.clone(), "capturing")
    }

    /// Enter `loading`; the flag clears when the guard drops.
    pub fn begin_operation(&self) -> FlagGuard {
        FlagGuard::raise(self.loading.clone(), "loading")
    }
}

/// Holds one state flag raised for as long as it lives.
#[must_use = "the flag is cleared as soon as the guard is dropped"]
pub struct FlagGuard {
    holders: Arc<AtomicUsize>,
    name: &'static str,
}

impl FlagGuard {
    fn raise(holders: Arc<AtomicUsize>, name: &'static str) -> Self {
        if holders.fetch_add(1, Ordering::SeqCst) > 0 {
            log::warn!("{} flag raised while already set", name);
        } else {
            log::debug!("{} -> true", name);
        }
        FlagGuard { holders, name }
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        if self.holders.fetch_sub(1, Ordering::SeqCst) == 1 {
            log::debug!("{} -> false", self.name);
        }
    }
}

/// The single mounted capture surface, shared between the page (which draws
/// into it) and the capturer (which snapshots it).
#[derive(Debug, Clone, Default)]
pub struct SurfaceSlot {
    inner: Arc<Mutex<Option<Surface>>>,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&self, surface: Surface) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(surface);
        }
    }

    pub fn unmount(&self) -> Option<Surface> {
        self.inner.lock().ok()?.take()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Run `f` against the live surface, if one is mounted.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Surface) -> R) -> Option<R> {
        let mut slot = self.inner.lock().ok()?;
        slot.as_mut().map(f)
    }

    /// Clone of the live surface for a capture pass.
    pub fn snapshot(&self) -> Option<Surface> {
        self.inner.lock().ok()?.clone()
    }
}

/// Requested artifact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureForm {
    DataUrl,
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Output of a capture. Not retained after the triggering operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    DataUrl(String),
    Blob(Blob),
}

/// Runs capture passes against a [`SurfaceSlot`].
#[derive(Clone)]
pub struct Capturer {
    slot: SurfaceSlot,
    state: ExportState,
    rasterizer: Arc<dyn Rasterizer>,
    config: ExportConfig,
}

impl Capturer {
    pub fn new(slot: SurfaceSlot, state: ExportState, rasterizer: Arc<dyn Rasterizer>, config: ExportConfig) -> Self {
        Self { slot, state, rasterizer, config }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Capture the mounted surface as a PNG artifact.
    ///
    /// Fails with [`Error::NotMounted`] before touching any state when no
    /// surface is mounted. Rasterizer errors, panics and empty output become
    /// [`Error::Capture`]. `capturing` is false again before this returns.
    pub async fn capture(&self, form: CaptureForm) -> Result<ExportArtifact> {
        if !self.slot.is_mounted() {
            log::error!("capture requested with no mounted surface");
            return Err(Error::NotMounted);
        }

        let png = {
            let _capturing = self.state.begin_capture();
            self.settle().await;
            // this pass holds a capture guard, so it always lays out unclipped
            self.rasterize(false).await?
        };

        Ok(match form {
            CaptureForm::DataUrl => ExportArtifact::DataUrl(png_data_url(&png)),
            CaptureForm::Blob => ExportArtifact::Blob(Blob { mime_type: "image/png".to_string(), bytes: png }),
        })
    }

    /// Wait for the relaxed layout to settle. The built-in layout is
    /// synchronous, so a zero delay only yields to the scheduler.
    async fn settle(&self) {
        if self.config.settle_delay_ms == 0 {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }
    }

    async fn rasterize(&self, clip: bool) -> Result<Vec<u8>> {
        let mut surface = self.slot.snapshot().ok_or(Error::NotMounted)?;
        let report = sanitize_tree(&mut surface.root, self.config.color_fallback);
        log::debug!("sanitized {} element(s) for capture", report.elements);

        let options = RasterOptions {
            pixel_ratio: self.config.pixel_ratio,
            cache_bust: true,
            clip,
        };
        let rasterizer = self.rasterizer.clone();
        let raster = tokio::task::spawn_blocking(move || rasterizer.rasterize(&surface, &options))
            .await
            .map_err(|e| {
                log::error!("rasterizer aborted: {}", e);
                Error::Capture(format!("rasterizer aborted: {}", e))
            })?
            .map_err(|e| {
                log::error!("rasterization failed: {}", e);
                match e {
                    Error::Capture(_) => e,
                    other => Error::Capture(other.to_string()),
                }
            })?;

        if raster.is_empty() {
            log::error!("rasterization produced no image data");
            return Err(Error::Capture("no image data".into()));
        }
        raster.to_png()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_restore_flags() {
        let state = ExportState::new();
        {
            let _op = state.begin_operation();
            assert!(state.is_loading());
            {
                let _cap = state.begin_capture();
                assert_eq!(state.snapshot(), StateSnapshot { capturing: true, loading: true });
            }
            assert!(!state.is_capturing());
            assert!(state.is_loading());
        }
        assert_eq!(state.snapshot(), StateSnapshot { capturing: false, loading: false });
    }

    #[test]
    fn guard_restores_flag_on_panic() {
        let state = ExportState::new();
        let s = state.clone();
        let res = std::panic::catch_unwind(move || {
            let _cap = s.begin_capture();
            panic!("rasterizer blew up");
        });
        assert!(res.is_err());
        assert!(!state.is_capturing());
    }

    #[test]
    fn slot_mount_and_unmount() {
        let slot = SurfaceSlot::new();
        assert!(!slot.is_mounted());
        assert!(slot.snapshot().is_none());
        let surface = Surface::from_html("<div></div>", crate::Viewport { width: 10, height: 10 }).unwrap();
        slot.mount(surface);
        assert!(slot.is_mounted());
        assert_eq!(slot.with_mut(|s| s.viewport.width), Some(10));
        assert!(slot.unmount().is_some());
        assert!(!slot.is_mounted());
    }

    #[test]
    fn overlapping_guards_keep_flag_raised() {
        let state = ExportState::new();
        let first = state.begin_capture();
        let second = state.begin_capture();
        drop(first);
        assert!(state.is_capturing());
        drop(second);
        assert!(!state.is_capturing());
    }

    /// Records whether each pass was clipped and whether `capturing` was set.
    struct RecordingRasterizer {
        state: ExportState,
        passes: Mutex<Vec<(bool, bool)>>,
    }

    impl Rasterizer for RecordingRasterizer {
        fn rasterize(&self, _surface: &Surface, options: &RasterOptions) -> Result<crate::rendering::Raster> {
            self.passes.lock().unwrap().push((options.clip, self.state.is_capturing()));
            Ok(crate::rendering::Raster { image: image::RgbaImage::new(1, 1) })
        }
    }

    #[tokio::test]
    async fn overlapping_captures_both_rasterize_unclipped() {
        let slot = SurfaceSlot::new();
        slot.mount(Surface::from_html("<div></div>", crate::Viewport { width: 10, height: 10 }).unwrap());
        let state = ExportState::new();
        let rasterizer = Arc::new(RecordingRasterizer { state: state.clone(), passes: Mutex::new(Vec::new()) });
        let config = ExportConfig { settle_delay_ms: 40, ..ExportConfig::default() };
        let first = Capturer::new(slot.clone(), state.clone(), rasterizer.clone(), config.clone());
        let second = first.clone();

        let (a, b) = tokio::join!(first.capture(CaptureForm::Blob), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            second.capture(CaptureForm::Blob).await
        });
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(*rasterizer.passes.lock().unwrap(), vec![(false, true), (false, true)]);
        assert!(!state.is_capturing());
    }
}
