//! Certificate artwork: an inline-styled HTML template filled from a record.
//!
//! The template is the capture surface. Its root clips overflow at the
//! configured viewport, draws its accents in wide-gamut colours that
//! need sanitizing before capture, and reserves the `qr-code` canvas the
//! verification code is drawn into.

use crate::qr::CODE_CANVAS_ID;
use crate::rendering::dom::Surface;
use crate::{CertificateRecord, ExportConfig};

/// Element id of the capture surface root.
pub const SURFACE_ID: &str = "certificate";

pub const LOGO_ASSET: &str = "logo.png";
pub const WATERMARK_ASSET: &str = "watermark.png";
pub const MANAGEMENT_SIGNATURE_ASSET: &str = "management-signature.png";

const ACCENT: &str = "oklch(0.45 0.12 260)";
const PAPER: &str = "#fffdf5";
const GOLD: &str = "oklch(0.75 0.14 85)";

/// Escape text for element content and double-quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the certificate markup for `record`.
pub fn render_html(record: &CertificateRecord, config: &ExportConfig) -> String {
    let e = escape_html;
    let qr = config.qr.size;
    format!(
        r#"<div id="{surface}" style="width: {w}px; height: {h}px; overflow: hidden; padding: 30px; border-width: 8px; border-color: {gold}; background-color: {paper}; color: rgb(40, 40, 40)">
  <img id="logo" src="{logo}" style="width: 120px; height: 40px">
  <h1 id="title" style="color: {accent}">CERTIFICATE OF ACHIEVEMENT</h1>
  <p>This is to certify that</p>
  <h2 id="full-name" style="color: {accent}">{name}</h2>
  <p>has successfully completed the course</p>
  <h2 id="course">{course}</h2>
  <p id="level">Level: {level}</p>
  <p id="dates">Issued: {date} Valid until: {expiry}</p>
  <p id="registration">Registration No: {reg}</p>
  <p id="email">Email: {email}</p>
  <img id="watermark" src="{watermark}" style="width: 100px; height: 100px">
  <div id="signatures" style="border-width: 1px; border-color: {gold}">
    <img id="signature" src="{signature}" style="width: 150px; height: 50px">
    <img id="management-signature" src="{management}" style="width: 150px; height: 50px">
  </div>
  <canvas id="{canvas}" style="width: {qr}px; height: {qr}px"></canvas>
  <p id="certificate-id">Certificate ID: {id}</p>
</div>"#,
        surface = SURFACE_ID,
        w = config.viewport.width,
        h = config.viewport.height,
        gold = GOLD,
        paper = PAPER,
        accent = ACCENT,
        logo = LOGO_ASSET,
        watermark = WATERMARK_ASSET,
        management = MANAGEMENT_SIGNATURE_ASSET,
        canvas = CODE_CANVAS_ID,
        qr = qr,
        name = e(record.full_name()),
        course = e(record.course_completed()),
        level = e(record.level_completed()),
        date = e(record.date()),
        expiry = e(record.expiry_date()),
        reg = e(record.registration_number()),
        email = e(record.email_address()),
        signature = e(record.signature()),
        id = e(record.id()),
    )
}

/// Build the capture surface for `record`. The code canvas starts empty.
pub fn build_surface(record: &CertificateRecord, config: &ExportConfig) -> Option<Surface> {
    let surface = Surface::from_html(&render_html(record, config), config.viewport)?;
    log::debug!("built certificate surface (generation {})", surface.generation);
    Some(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::dom::{ElementContent, Overflow};

    fn record() -> CertificateRecord {
        CertificateRecord::from_query(
            "id=42&date=2024-01-01&expiryDate=2026-01-01&registrationNumber=REG-001&fullName=Jane+%3CDoe%3E\
             &emailAddress=jane%40example.com&courseCompleted=Rust+%26+Tokio&levelCompleted=Advanced\
             &signature=sig.png&qrCode=verify%3AREG-001",
        )
        .unwrap()
    }

    #[test]
    fn escapes_markup_in_fields() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        let html = render_html(&record(), &ExportConfig::default());
        assert!(html.contains("Jane &lt;Doe&gt;"));
        assert!(html.contains("Rust &amp; Tokio"));
    }

    #[test]
    fn surface_carries_record_and_code_canvas() {
        let s = build_surface(&record(), &ExportConfig::default()).unwrap();
        let root = s.root.as_element().unwrap();
        assert_eq!(root.id.as_deref(), Some(SURFACE_ID));
        assert_eq!(root.style.width, Some(1000));
        assert_eq!(root.style.height, Some(700));
        assert_eq!(root.style.overflow, Overflow::Hidden);

        assert_eq!(s.find_by_id("full-name").unwrap().children()[0].text(), "Jane <Doe>");
        assert_eq!(s.find_by_id("course").unwrap().children()[0].text(), "Rust & Tokio");
        assert_eq!(
            s.find_by_id("signature").unwrap().content,
            ElementContent::Image { src: "sig.png".into() }
        );
        let canvas = s.find_by_id(CODE_CANVAS_ID).unwrap();
        assert_eq!(canvas.style.width, Some(90));
        assert_eq!(canvas.content, ElementContent::Canvas { bitmap: None });
    }

    #[test]
    fn template_uses_wide_gamut_colours() {
        let s = build_surface(&record(), &ExportConfig::default()).unwrap();
        assert!(s.find_by_id("title").unwrap().style.color.starts_with("oklch("));
        assert!(s.root.as_element().unwrap().style.border_color.starts_with("oklch("));
        assert_eq!(s.root.as_element().unwrap().style.background_color, "#fffdf5");
    }
}
