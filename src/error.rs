//! Error types for certificate loading, rendering and export

use thiserror::Error;

/// Result type alias for certshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Shown when any required query key is absent.
pub const MSG_INCOMPLETE_DATA: &str = "Certificate data is incomplete in the URL.";
/// Shown when the verification code cannot be encoded.
pub const MSG_CODE_RENDER: &str = "Failed to generate QR code.";
pub const MSG_DOWNLOAD_FAILED: &str = "Failed to download certificate.";
pub const MSG_PRINT_FAILED: &str = "Failed to print certificate.";
pub const MSG_SHARE_UNSUPPORTED: &str = "Sharing is not supported on this device.";
pub const MSG_SHARE_FAILED: &str = "Error sharing certificate.";
pub const MSG_BUSY: &str = "An export is already in progress.";

/// Errors that can occur while loading, rendering or exporting a certificate
#[derive(Error, Debug)]
pub enum Error {
    /// One or more required query keys were missing
    #[error("Certificate data is incomplete (missing: {})", .missing.join(", "))]
    IncompleteData { missing: Vec<&'static str> },

    /// The verification payload could not be encoded
    #[error("QR code generation failed: {0}")]
    CodeRender(String),

    /// No capture surface is mounted
    #[error("Capture surface is not mounted")]
    NotMounted,

    /// Rasterization failed or produced no data
    #[error("Capture failed: {0}")]
    Capture(String),

    /// PNG encoding failed
    #[error("Image encoding failed: {0}")]
    Encode(String),

    /// The host could not save the file
    #[error("Save failed: {0}")]
    Save(String),

    /// The host print pipeline failed
    #[error("Print failed: {0}")]
    Print(String),

    /// Building or delivering the share payload failed
    #[error("Share failed: {0}")]
    Share(String),

    /// Another export operation holds the export lock
    #[error("Export already in progress")]
    Busy,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The non-blocking notice a user should see for this error, if any.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Error::IncompleteData { .. } => Some(MSG_INCOMPLETE_DATA),
            Error::CodeRender(_) => Some(MSG_CODE_RENDER),
            Error::Busy => Some(MSG_BUSY),
            Error::Share(_) => Some(MSG_SHARE_FAILED),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_data_lists_missing_keys() {
        let e = Error::IncompleteData { missing: vec!["expiryDate", "qrCode"] };
        assert_eq!(e.to_string(), "Certificate data is incomplete (missing: expiryDate, qrCode)");
        assert_eq!(e.user_message(), Some(MSG_INCOMPLETE_DATA));
    }

    #[test]
    fn capture_errors_have_no_direct_notice() {
        assert!(Error::Capture("boom".into()).user_message().is_none());
        assert!(Error::NotMounted.user_message().is_none());
    }
}
