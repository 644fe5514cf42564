//! Export operations: download, print and share.
//!
//! Each operation runs one capture and routes the artifact to a host
//! capability. Operations never return errors: failures are logged, turned
//! into user notices and reported as an [`ExportOutcome`]. Operations are
//! serialized through a single-slot lock; a trigger that arrives while
//! another export is in flight is rejected with [`ExportOutcome::Busy`].

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::capture::{Blob, CaptureForm, Capturer, ExportArtifact, ExportState};
use crate::error::{MSG_BUSY, MSG_DOWNLOAD_FAILED, MSG_PRINT_FAILED, MSG_SHARE_FAILED, MSG_SHARE_UNSUPPORTED};
use crate::platform::{print_document, FilePayload, HostPlatform, Notice, SharePayload};
use crate::{CertificateRecord, Error, Result};

/// How an export operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed,
    /// Another export held the lock
    Busy,
    /// The host lacks the capability (share unsupported, popup blocked)
    Unsupported,
    /// The operation failed; a notice was raised where the user needs one
    Failed(String),
}

pub struct Exporter {
    capturer: Capturer,
    platform: Arc<dyn HostPlatform>,
    file_name: String,
    share_title: String,
    share_text: String,
    lock: Mutex<()>,
}

impl Exporter {
    pub fn new(capturer: Capturer, platform: Arc<dyn HostPlatform>, record: &CertificateRecord, share_title: &str) -> Self {
        Self {
            capturer,
            platform,
            file_name: record.export_file_name(),
            share_title: share_title.to_string(),
            share_text: format!("I have successfully completed the {} course!", record.course_completed()),
            lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &ExportState {
        self.capturer.state()
    }

    /// `certificate-<registrationNumber>.png`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Capture as a data URL and hand it to the host's file saver.
    pub async fn download(&self) -> ExportOutcome {
        let Ok(_serial) = self.lock.try_lock() else { return self.busy("download") };
        let _loading = self.state().begin_operation();

        let result = async {
            let data_url = self.capture_data_url().await?;
            self.platform.file_saver().save(&self.file_name, &data_url).map_err(Error::Save)?;
            log::info!("downloaded {}", self.file_name);
            Ok(())
        }
        .await;

        self.finish("download", result, MSG_DOWNLOAD_FAILED)
    }

    /// Capture as a data URL, open a print window holding only that image,
    /// print it and close the window afterwards.
    ///
    /// A blocked popup aborts silently after logging.
    pub async fn print(&self) -> ExportOutcome {
        let Ok(_serial) = self.lock.try_lock() else { return self.busy("print") };
        let _loading = self.state().begin_operation();

        let data_url = match self.capture_data_url().await {
            Ok(d) => d,
            Err(e) => return self.finish("print", Err(e), MSG_PRINT_FAILED),
        };

        let Some(mut window) = self.platform.print_host().open_window() else {
            log::error!("print window could not be opened (popup blocked?)");
            return ExportOutcome::Unsupported;
        };
        window.write_document(&print_document(&data_url));
        let printed = window.print().map_err(Error::Print);
        window.close();

        self.finish("print", printed, MSG_PRINT_FAILED)
    }

    /// Capture as a PNG blob and deliver it through the native share sheet.
    pub async fn share(&self) -> ExportOutcome {
        let Ok(_serial) = self.lock.try_lock() else { return self.busy("share") };
        let _loading = self.state().begin_operation();

        let payload = match self.share_payload().await {
            Ok(p) => p,
            Err(e) => return self.finish("share", Err(e), MSG_SHARE_FAILED),
        };

        let host = self.platform.share_host();
        if !host.can_share(&payload) {
            log::info!("host cannot share file payloads");
            self.platform.notices().notify(Notice::info(MSG_SHARE_UNSUPPORTED));
            return ExportOutcome::Unsupported;
        }

        let shared = host.share(&payload).map_err(Error::Share);
        self.finish("share", shared, MSG_SHARE_FAILED)
    }

    async fn capture_data_url(&self) -> Result<String> {
        match self.capturer.capture(CaptureForm::DataUrl).await? {
            ExportArtifact::DataUrl(d) => Ok(d),
            ExportArtifact::Blob(_) => Err(Error::Capture("expected a data URL".into())),
        }
    }

    async fn share_payload(&self) -> Result<SharePayload> {
        let Blob { mime_type, bytes } = match self.capturer.capture(CaptureForm::Blob).await? {
            ExportArtifact::Blob(b) => b,
            ExportArtifact::DataUrl(_) => return Err(Error::Share("expected a blob".into())),
        };
        if bytes.is_empty() {
            return Err(Error::Share("empty image blob".into()));
        }
        Ok(SharePayload {
            title: self.share_title.clone(),
            text: self.share_text.clone(),
            files: vec![FilePayload { name: self.file_name.clone(), mime_type, bytes }],
        })
    }

    fn busy(&self, op: &str) -> ExportOutcome {
        log::warn!("{} rejected: another export is in progress", op);
        self.platform.notices().notify(Notice::info(MSG_BUSY));
        ExportOutcome::Busy
    }

    /// Convert an operation result into an outcome, raising `notice` on failure.
    fn finish(&self, op: &str, result: Result<()>, notice: &'static str) -> ExportOutcome {
        match result {
            Ok(()) => ExportOutcome::Completed,
            Err(e) => {
                log::error!("{} failed: {}", op, e);
                self.platform.notices().notify(Notice::error(notice));
                ExportOutcome::Failed(e.to_string())
            }
        }
    }
}
