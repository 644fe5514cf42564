//! Host platform surface: file saving, print windows, native share, notices
//! and asset resolution.
//!
//! The export pipeline never talks to a browser or OS directly; it goes
//! through these traits so each host (web shell, desktop shell, CLI, tests)
//! plugs in its own capabilities.

pub mod assets;
pub mod download;
pub mod fs;
pub mod notice;
pub mod print;
pub mod share;

use std::sync::{Mutex, PoisonError};

pub use assets::{AssetProvider, DirAssets, MemoryAssets};
pub use download::{decode_data_url, FileSaver};
pub use fs::FsPlatform;
pub use notice::{LogNotices, Notice, NoticeLevel, NoticeSink};
pub use print::{print_document, PrintHost, PrintWindow};
pub use share::{FilePayload, SharePayload, ShareHost};

/// Composite of every host capability the exporter needs.
pub trait HostPlatform: Send + Sync {
    fn file_saver(&self) -> &dyn FileSaver;
    fn print_host(&self) -> &dyn PrintHost;
    fn share_host(&self) -> &dyn ShareHost;
    fn notices(&self) -> &dyn NoticeSink;
}

/// A platform that accepts saves silently, blocks popups, cannot share and
/// forwards notices to the log.
pub struct NoopPlatform;

impl NoopPlatform {
    pub fn new() -> Self {
        NoopPlatform
    }
}

impl Default for NoopPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSaver for NoopPlatform {
    fn save(&self, _file_name: &str, _data_url: &str) -> Result<(), String> {
        Ok(())
    }
}

impl PrintHost for NoopPlatform {
    fn open_window(&self) -> Option<Box<dyn PrintWindow>> {
        None
    }
}

impl ShareHost for NoopPlatform {
    fn can_share(&self, _payload: &SharePayload) -> bool {
        false
    }

    fn share(&self, _payload: &SharePayload) -> Result<(), String> {
        Err("sharing not supported".to_string())
    }
}

impl HostPlatform for NoopPlatform {
    fn file_saver(&self) -> &dyn FileSaver {
        self
    }

    fn print_host(&self) -> &dyn PrintHost {
        self
    }

    fn share_host(&self) -> &dyn ShareHost {
        self
    }

    fn notices(&self) -> &dyn NoticeSink {
        &LogNotices
    }
}

/// Steps observed by a [`RecordingPlatform`] print window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintEvent {
    Opened,
    Document(String),
    Printed,
    Closed,
}

/// In-memory platform that records every interaction, for tests. A recorder
/// whose lock was poisoned by a panicking caller keeps what it recorded.
pub struct RecordingPlatform {
    popup_blocked: bool,
    share_capable: bool,
    share_error: Option<String>,
    save_error: Option<String>,
    print_error: Option<String>,
    saved: Mutex<Vec<(String, String)>>,
    print_events: std::sync::Arc<Mutex<Vec<PrintEvent>>>,
    shared: Mutex<Vec<SharePayload>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        RecordingPlatform {
            popup_blocked: false,
            share_capable: true,
            share_error: None,
            save_error: None,
            print_error: None,
            saved: Mutex::new(Vec::new()),
            print_events: std::sync::Arc::new(Mutex::new(Vec::new())),
            shared: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn with_popup_blocked(mut self) -> Self {
        self.popup_blocked = true;
        self
    }

    pub fn with_share_capable(mut self, capable: bool) -> Self {
        self.share_capable = capable;
        self
    }

    pub fn with_share_error(mut self, msg: &str) -> Self {
        self.share_error = Some(msg.to_string());
        self
    }

    pub fn with_save_error(mut self, msg: &str) -> Self {
        self.save_error = Some(msg.to_string());
        self
    }

    pub fn with_print_error(mut self, msg: &str) -> Self {
        self.print_error = Some(msg.to_string());
        self
    }

    /// `(file_name, data_url)` pairs passed to the file saver
    pub fn saved(&self) -> Vec<(String, String)> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn print_events(&self) -> Vec<PrintEvent> {
        self.print_events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn shared(&self) -> Vec<SharePayload> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn recorded_notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn notice_messages(&self) -> Vec<String> {
        self.recorded_notices().into_iter().map(|n| n.message).collect()
    }
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

struct RecordingPrintWindow {
    events: std::sync::Arc<Mutex<Vec<PrintEvent>>>,
    print_error: Option<String>,
}

impl RecordingPrintWindow {
    fn push(&self, ev: PrintEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(ev);
    }
}

impl PrintWindow for RecordingPrintWindow {
    fn write_document(&mut self, html: &str) {
        self.push(PrintEvent::Document(html.to_string()));
    }

    fn print(&mut self) -> Result<(), String> {
        if let Some(e) = &self.print_error {
            return Err(e.clone());
        }
        self.push(PrintEvent::Printed);
        Ok(())
    }

    fn close(&mut self) {
        self.push(PrintEvent::Closed);
    }
}

impl FileSaver for RecordingPlatform {
    fn save(&self, file_name: &str, data_url: &str) -> Result<(), String> {
        if let Some(e) = &self.save_error {
            return Err(e.clone());
        }
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).push((file_name.to_string(), data_url.to_string()));
        Ok(())
    }
}

impl PrintHost for RecordingPlatform {
    fn open_window(&self) -> Option<Box<dyn PrintWindow>> {
        if self.popup_blocked {
            return None;
        }
        self.print_events.lock().unwrap_or_else(PoisonError::into_inner).push(PrintEvent::Opened);
        Some(Box::new(RecordingPrintWindow {
            events: self.print_events.clone(),
            print_error: self.print_error.clone(),
        }))
    }
}

impl ShareHost for RecordingPlatform {
    fn can_share(&self, payload: &SharePayload) -> bool {
        self.share_capable && !payload.files.is_empty()
    }

    fn share(&self, payload: &SharePayload) -> Result<(), String> {
        if let Some(e) = &self.share_error {
            return Err(e.clone());
        }
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).push(payload.clone());
        Ok(())
    }
}

impl NoticeSink for RecordingPlatform {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).push(notice);
    }
}

impl HostPlatform for RecordingPlatform {
    fn file_saver(&self) -> &dyn FileSaver {
        self
    }

    fn print_host(&self) -> &dyn PrintHost {
        self
    }

    fn share_host(&self) -> &dyn ShareHost {
        self
    }

    fn notices(&self) -> &dyn NoticeSink {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_platform_provides_noop_surfaces() {
        let p = NoopPlatform::new();
        assert!(p.file_saver().save("a.png", "data:image/png;base64,").is_ok());
        assert!(p.print_host().open_window().is_none());
        let payload = SharePayload { title: "t".into(), text: "x".into(), files: Vec::new() };
        assert!(!p.share_host().can_share(&payload));
    }

    #[test]
    fn recording_platform_records_print_lifecycle() {
        let p = RecordingPlatform::new();
        let mut w = p.print_host().open_window().unwrap();
        w.write_document("<html></html>");
        w.print().unwrap();
        w.close();
        assert_eq!(
            p.print_events(),
            vec![
                PrintEvent::Opened,
                PrintEvent::Document("<html></html>".into()),
                PrintEvent::Printed,
                PrintEvent::Closed
            ]
        );
    }

    #[test]
    fn recording_survives_poisoned_lock() {
        let p = RecordingPlatform::new();
        p.save("a.png", "data:image/png;base64,").unwrap();
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _held = p.saved.lock().unwrap();
            panic!("caller panicked while holding the recorder");
        }));
        assert!(poisoned.is_err());
        assert!(p.saved.is_poisoned());

        p.save("b.png", "data:image/png;base64,").unwrap();
        let names: Vec<String> = p.saved().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
