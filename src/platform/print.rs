//! Print window primitives

pub trait PrintHost: Send + Sync {
    /// Open a new output surface. `None` means the host refused (popup blocked).
    fn open_window(&self) -> Option<Box<dyn PrintWindow>>;
}

pub trait PrintWindow: Send {
    fn write_document(&mut self, html: &str);
    /// Show the print dialog; returns once it is dismissed.
    fn print(&mut self) -> Result<(), String>;
    fn close(&mut self);
}

/// The ephemeral document sent to the print pipeline: one full-width image.
pub fn print_document(data_url: &str) -> String {
    format!(
        "<html><head><title>Print Certificate</title></head>\
         <body style=\"margin:0\"><img src=\"{}\" style=\"width:100%\"></body></html>",
        data_url
    )
}
