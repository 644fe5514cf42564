//! Filesystem-backed host used by the command line tool.
//!
//! Downloads land in the output directory, the print document is written
//! next to them for an external viewer to print, and native sharing is not
//! available.

use std::path::PathBuf;
use std::sync::Mutex;

use super::{decode_data_url, FileSaver, HostPlatform, Notice, NoticeSink, PrintHost, PrintWindow, ShareHost, SharePayload};

pub struct FsPlatform {
    out_dir: PathBuf,
    notices: Mutex<Vec<Notice>>,
}

impl FsPlatform {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        FsPlatform { out_dir: out_dir.into(), notices: Mutex::new(Vec::new()) }
    }

    /// Drain notices raised so far.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|mut n| std::mem::take(&mut *n)).unwrap_or_default()
    }
}

impl FileSaver for FsPlatform {
    fn save(&self, file_name: &str, data_url: &str) -> Result<(), String> {
        let (_, bytes) = decode_data_url(data_url)?;
        std::fs::create_dir_all(&self.out_dir).map_err(|e| e.to_string())?;
        let path = self.out_dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| format!("{}: {}", path.display(), e))?;
        log::info!("saved {}", path.display());
        Ok(())
    }
}

struct FilePrintWindow {
    path: PathBuf,
    document: Option<String>,
}

impl PrintWindow for FilePrintWindow {
    fn write_document(&mut self, html: &str) {
        self.document = Some(html.to_string());
    }

    fn print(&mut self) -> Result<(), String> {
        let doc = self.document.as_deref().ok_or("print window has no document")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&self.path, doc).map_err(|e| format!("{}: {}", self.path.display(), e))?;
        log::info!("print document written to {}", self.path.display());
        Ok(())
    }

    fn close(&mut self) {
        self.document = None;
    }
}

impl PrintHost for FsPlatform {
    fn open_window(&self) -> Option<Box<dyn PrintWindow>> {
        Some(Box::new(FilePrintWindow { path: self.out_dir.join("print-certificate.html"), document: None }))
    }
}

impl ShareHost for FsPlatform {
    fn can_share(&self, _payload: &SharePayload) -> bool {
        false
    }

    fn share(&self, _payload: &SharePayload) -> Result<(), String> {
        Err("native sharing is unavailable from the command line".to_string())
    }
}

impl NoticeSink for FsPlatform {
    fn notify(&self, notice: Notice) {
        if let Ok(mut n) = self.notices.lock() {
            n.push(notice);
        }
    }
}

impl HostPlatform for FsPlatform {
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
    use crate::platform::print_document;

    #[test]
    fn save_and_print_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = FsPlatform::new(dir.path());
        p.save("certificate-REG-001.png", "data:image/png;base64,iVBORw==").unwrap();
        assert_eq!(std::fs::read(dir.path().join("certificate-REG-001.png")).unwrap(), b"\x89PNG");

        let mut w = p.open_window().unwrap();
        w.write_document(&print_document("data:image/png;base64,iVBORw=="));
        w.print().unwrap();
        w.close();
        let html = std::fs::read_to_string(dir.path().join("print-certificate.html")).unwrap();
        assert!(html.contains("<img"));
    }

    #[test]
    fn sharing_is_unavailable() {
        let p = FsPlatform::new("unused");
        let payload = SharePayload { title: "t".into(), text: "x".into(), files: Vec::new() };
        assert!(!p.can_share(&payload));
    }
}
