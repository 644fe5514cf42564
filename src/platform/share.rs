//! Native share capability

/// A named file attached to a share request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub files: Vec<FilePayload>,
}

pub trait ShareHost: Send + Sync {
    /// Whether the host can share this payload (file sharing in particular).
    fn can_share(&self, payload: &SharePayload) -> bool;
    fn share(&self, payload: &SharePayload) -> Result<(), String>;
}
