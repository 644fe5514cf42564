//! Certificate record loading from page query parameters.

use crate::{Error, Result};
use url::form_urlencoded;

/// The ten query keys every certificate URL must carry, in display order.
pub const REQUIRED_KEYS: [&str; 10] = [
    "id",
    "date",
    "expiryDate",
    "registrationNumber",
    "fullName",
    "emailAddress",
    "courseCompleted",
    "levelCompleted",
    "signature",
    "qrCode",
];

/// A validated certificate payload.
///
/// All ten fields are mandatory. The record is built once per page load by
/// [`CertificateRecord::from_query`] and never mutated afterwards, so fields
/// are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    id: String,
    date: String,
    expiry_date: String,
    registration_number: String,
    full_name: String,
    email_address: String,
    course_completed: String,
    level_completed: String,
    signature: String,
    qr_code: String,
}

impl CertificateRecord {
    /// Parse a raw query string (leading `?` optional).
    ///
    /// Values are percent-decoded with URLSearchParams semantics. If any
    /// required key is absent the whole record is rejected with
    /// [`Error::IncompleteData`]; no partial record is ever returned. No other
    /// validation is performed.
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut values: [Option<String>; 10] = Default::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if let Some(idx) = REQUIRED_KEYS.iter().position(|k| *k == key) {
                // first occurrence wins, like URLSearchParams::get
                if values[idx].is_none() {
                    values[idx] = Some(value.into_owned());
                }
            }
        }

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            log::warn!("certificate query is missing keys: {}", missing.join(", "));
            return Err(Error::IncompleteData { missing });
        }

        let [id, date, expiry_date, registration_number, full_name, email_address, course_completed, level_completed, signature, qr_code] =
            values.map(Option::unwrap_or_default);

        Ok(Self {
            id,
            date,
            expiry_date,
            registration_number,
            full_name,
            email_address,
            course_completed,
            level_completed,
            signature,
            qr_code,
        })
    }

    /// Parse the query component of a full page URL.
    pub fn from_url(page_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(page_url)
            .map_err(|e| Error::ConfigError(format!("invalid page URL {}: {}", page_url, e)))?;
        Self::from_query(parsed.query().unwrap_or(""))
    }

    /// Serialize back into a percent-encoded query string.
    pub fn to_query(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (key, value) in REQUIRED_KEYS.iter().zip(self.values()) {
            ser.append_pair(key, value);
        }
        ser.finish()
    }

    fn values(&self) -> [&str; 10] {
        [
            &self.id,
            &self.date,
            &self.expiry_date,
            &self.registration_number,
            &self.full_name,
            &self.email_address,
            &self.course_completed,
            &self.level_completed,
            &self.signature,
            &self.qr_code,
        ]
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn expiry_date(&self) -> &str {
        &self.expiry_date
    }

    pub fn registration_number(&self) -> &str {
        &self.registration_number
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email_address(&self) -> &str {
        &self.email_address
    }

    pub fn course_completed(&self) -> &str {
        &self.course_completed
    }

    pub fn level_completed(&self) -> &str {
        &self.level_completed
    }

    /// Asset reference of the holder's signature image.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Opaque verification payload rendered as the QR code.
    pub fn qr_code(&self) -> &str {
        &self.qr_code
    }

    /// File name used by every export: `certificate-<registrationNumber>.png`.
    pub fn export_file_name(&self) -> String {
        format!("certificate-{}.png", self.registration_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_query() -> String {
        "id=C-1&date=2024-01-02&expiryDate=2026-01-02&registrationNumber=REG-001\
         &fullName=Jane%20Doe&emailAddress=jane%40example.com&courseCompleted=Rust+Basics\
         &levelCompleted=Advanced&signature=sig.png&qrCode=verify%3AREG-001"
            .to_string()
    }

    #[test]
    fn parses_and_decodes_all_keys() {
        let rec = CertificateRecord::from_query(&full_query()).unwrap();
        assert_eq!(rec.full_name(), "Jane Doe");
        assert_eq!(rec.email_address(), "jane@example.com");
        assert_eq!(rec.course_completed(), "Rust Basics");
        assert_eq!(rec.qr_code(), "verify:REG-001");
        assert_eq!(rec.export_file_name(), "certificate-REG-001.png");
    }

    #[test]
    fn leading_question_mark_is_accepted() {
        let rec = CertificateRecord::from_query(&format!("?{}", full_query())).unwrap();
        assert_eq!(rec.id(), "C-1");
    }

    #[test]
    fn each_missing_key_rejects_the_record() {
        for key in REQUIRED_KEYS {
            let query: String = full_query()
                .split('&')
                .filter(|pair| !pair.starts_with(&format!("{}=", key)))
                .collect::<Vec<_>>()
                .join("&");
            match CertificateRecord::from_query(&query) {
                Err(Error::IncompleteData { missing }) => assert_eq!(missing, vec![key]),
                other => panic!("expected incomplete data for {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn empty_values_count_as_present() {
        let query = full_query().replace("levelCompleted=Advanced", "levelCompleted=");
        let rec = CertificateRecord::from_query(&query).unwrap();
        assert_eq!(rec.level_completed(), "");
    }

    #[test]
    fn first_occurrence_wins() {
        let query = format!("{}&fullName=Someone+Else", full_query());
        let rec = CertificateRecord::from_query(&query).unwrap();
        assert_eq!(rec.full_name(), "Jane Doe");
    }

    #[test]
    fn to_query_round_trips() {
        let rec = CertificateRecord::from_query(&full_query()).unwrap();
        let again = CertificateRecord::from_query(&rec.to_query()).unwrap();
        assert_eq!(rec, again);
    }

    #[test]
    fn percent_encoding_round_trips_raw_values() {
        for raw in ["Jane Doe", "100% done & dusted", "Zoë / Ørsted", "a+b=c?"] {
            let encoded: String = form_urlencoded::byte_serialize(raw.as_bytes()).collect();
            let query = full_query().replace("fullName=Jane%20Doe", &format!("fullName={}", encoded));
            let rec = CertificateRecord::from_query(&query).unwrap();
            assert_eq!(rec.full_name(), raw);
        }
    }

    #[test]
    fn from_url_reads_query_component() {
        let url = format!("https://certs.example/view?{}", full_query());
        let rec = CertificateRecord::from_url(&url).unwrap();
        assert_eq!(rec.registration_number(), "REG-001");
    }
}
