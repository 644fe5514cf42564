//! File-save trigger used by the download export

use base64::Engine as _;

pub trait FileSaver: Send + Sync {
    /// Save `data_url` under `file_name` (the transient download anchor).
    fn save(&self, file_name: &str, data_url: &str) -> Result<(), String>;
}

/// Split a base64 `data:` URL into its MIME type and decoded bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), String> {
    let rest = data_url.strip_prefix("data:").ok_or("not a data URL")?;
    let (meta, payload) = rest.split_once(',').ok_or("data URL has no payload")?;
    let mime = meta.strip_suffix(";base64").ok_or("only base64 data URLs are supported")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64 payload: {}", e))?;
    Ok((mime.to_string(), bytes))
}
