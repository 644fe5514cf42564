use std::sync::Arc;

use certshot::platform::{MemoryAssets, RecordingPlatform};
use certshot::{CertificatePage, ExportConfig};

const QUERY: &str = "id=1&date=2024-01-01&expiryDate=2026-01-01&registrationNumber=REG-001\
    &fullName=Jane+Doe&emailAddress=jane%40example.com&courseCompleted=Rust\
    &levelCompleted=Advanced&signature=sig.png&qrCode=verify%3AREG-001";

#[tokio::test]
async fn standalone_code_image_is_stable() {
    let load = || {
        CertificatePage::load(
            QUERY,
            ExportConfig { settle_delay_ms: 0, ..ExportConfig::default() },
            Arc::new(RecordingPlatform::new()),
            Arc::new(MemoryAssets::new()),
        )
    };
    let a = load();
    let b = load();
    let code_a = a.code_image().expect("code rendered");
    let code_b = b.code_image().expect("code rendered");
    assert_eq!(code_a.fingerprint(), code_b.fingerprint());
    assert_eq!(code_a.image.dimensions(), (90, 90));
    assert_eq!(code_a.to_data_url().unwrap(), code_b.to_data_url().unwrap());
}
