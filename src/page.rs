//! Page-load composition: record → template → verification code → mount.
//!
//! Loading never fails. An incomplete query leaves the page with an error
//! message and nothing mounted; a code render failure raises a notice and
//! the certificate still renders with an empty code canvas.

use std::sync::Arc;

use crate::certificate::build_surface;
use crate::error::{MSG_CODE_RENDER, MSG_INCOMPLETE_DATA};
use crate::platform::{AssetProvider, HostPlatform, Notice};
use crate::rendering::{Rasterizer, SurfaceRasterizer};
use crate::{
    CertificateRecord, CodeRenderer, Capturer, Error, ExportConfig, ExportState, Exporter, RenderedCodeImage, Result,
    SurfaceSlot,
};

pub struct CertificatePage {
    record: Option<CertificateRecord>,
    error_message: Option<&'static str>,
    config: ExportConfig,
    platform: Arc<dyn HostPlatform>,
    slot: SurfaceSlot,
    code: CodeRenderer,
    exporter: Option<Exporter>,
}

impl CertificatePage {
    /// Load a page from a query string using the built-in rasterizer.
    pub fn load(
        query: &str,
        config: ExportConfig,
        platform: Arc<dyn HostPlatform>,
        assets: Arc<dyn AssetProvider>,
    ) -> Self {
        Self::load_with_rasterizer(query, config, platform, Arc::new(SurfaceRasterizer::new(assets)))
    }

    /// Load a page whose captures go through `rasterizer`.
    pub fn load_with_rasterizer(
        query: &str,
        config: ExportConfig,
        platform: Arc<dyn HostPlatform>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        let mut page = CertificatePage {
            record: None,
            error_message: None,
            code: CodeRenderer::new(config.qr),
            config,
            platform,
            slot: SurfaceSlot::new(),
            exporter: None,
        };

        let record = match CertificateRecord::from_query(query) {
            Ok(r) => r,
            Err(e) => {
                if let Error::IncompleteData { missing } = &e {
                    log::error!("certificate query is missing {:?}", missing);
                }
                page.error_message = Some(e.user_message().unwrap_or(MSG_INCOMPLETE_DATA));
                page.platform.notices().notify(Notice::error(MSG_INCOMPLETE_DATA));
                return page;
            }
        };

        if let Err(e) = page.mount(&record) {
            log::error!("certificate could not be mounted: {}", e);
        }

        let state = ExportState::new();
        let capturer = Capturer::new(page.slot.clone(), state, rasterizer, page.config.clone());
        page.exporter = Some(Exporter::new(capturer, page.platform.clone(), &record, &page.config.share_title));
        page.record = Some(record);
        page
    }

    /// Rebuild the surface from the record and redraw the verification code.
    pub fn remount(&mut self) -> Result<()> {
        let Some(record) = self.record.clone() else { return Err(Error::NotMounted) };
        self.mount(&record)
    }

    fn mount(&mut self, record: &CertificateRecord) -> Result<()> {
        let mut surface = build_surface(record, &self.config).ok_or(Error::NotMounted)?;
        if let Err(e) = self.code.sync(record.qr_code(), &mut surface) {
            log::error!("{}", e);
            self.platform.notices().notify(Notice::error(MSG_CODE_RENDER));
        }
        self.slot.mount(surface);
        Ok(())
    }

    pub fn record(&self) -> Option<&CertificateRecord> {
        self.record.as_ref()
    }

    /// Message shown in place of the certificate when loading failed.
    pub fn error_message(&self) -> Option<&'static str> {
        self.error_message
    }

    /// `None` when the record is incomplete; no exports are offered then.
    pub fn exporter(&self) -> Option<&Exporter> {
        self.exporter.as_ref()
    }

    /// The standalone verification code, if it rendered.
    pub fn code_image(&self) -> Option<&RenderedCodeImage> {
        self.code.published()
    }

    pub fn slot(&self) -> &SurfaceSlot {
        &self.slot
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }
}
