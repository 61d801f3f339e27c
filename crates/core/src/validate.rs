//! Provider record validation and image sanitizing.
//!
//! A raw provider record is accepted only if every known field has the
//! expected shape; one bad field rejects the whole record. Accepted records
//! then have their images filtered against the blocked-domain list and
//! reduced to the single largest image.

use serde_json::{Map, Value};

use crate::domain::registrable_domain;
use crate::record::{Image, ValidatedRecord};

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("field {field}: expected {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("field {field}: invalid URL {value:?}")]
    InvalidUrl { field: String, value: String },
}

/// Validates raw provider records against the record schema.
#[derive(Debug, Clone, Default)]
pub struct RecordValidator {
    blocked_domains: Vec<String>,
}

impl RecordValidator {
    pub fn new<I, S>(blocked_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked_domains = blocked_domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_end_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { blocked_domains }
    }

    pub fn blocked_domains(&self) -> &[String] {
        &self.blocked_domains
    }

    /// Validate one raw record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the record is not an object or any known
    /// field has the wrong type. Unknown fields are ignored.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedRecord, ValidationError> {
        let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

        let mut record = ValidatedRecord {
            description: string_field(obj, "description")?,
            favicon_url: url_field(obj, "favicon_url")?,
            images: images_field(obj)?,
            original_url: url_field(obj, "original_url")?,
            provider_display: string_field(obj, "provider_display")?,
            provider_name: string_field(obj, "provider_name")?,
            provider_url: url_field(obj, "provider_url")?,
            title: string_field(obj, "title")?,
            kind: string_field(obj, "type")?,
            url: url_field(obj, "url")?,
        };

        let images = std::mem::take(&mut record.images);
        let own_domain = record.original_url.as_deref().and_then(registrable_domain);
        record.images = largest_image(self.filter_blocked(images, own_domain.as_deref()))
            .into_iter()
            .collect();

        Ok(record)
    }

    /// Drop images hosted on blocked domains, except the record's own domain.
    fn filter_blocked(&self, images: Vec<Image>, own_domain: Option<&str>) -> Vec<Image> {
        images
            .into_iter()
            .filter(|image| {
                let Some(domain) = image.url.as_deref().and_then(registrable_domain) else {
                    return true;
                };
                if own_domain == Some(domain.as_str()) {
                    return true;
                }
                !self.blocked_domains.iter().any(|blocked| *blocked == domain)
            })
            .collect()
    }
}

/// Largest image by area; the first one wins ties.
fn largest_image(images: Vec<Image>) -> Option<Image> {
    images.into_iter().fold(None, |best: Option<Image>, image| match best {
        Some(current) if current.area() >= image.area() => Some(current),
        _ => Some(image),
    })
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::WrongType { field: field.into(), expected: "string or null" }),
    }
}

fn url_field(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, ValidationError> {
    check_url(field, string_field(obj, field)?)
}

fn check_url(field: &str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match url::Url::parse(&value) {
        Ok(parsed) if parsed.has_host() => Ok(Some(value)),
        _ => Err(ValidationError::InvalidUrl { field: field.into(), value }),
    }
}

fn int_field(obj: &Map<String, Value>, field: &str) -> Result<Option<i64>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| ValidationError::WrongType { field: field.into(), expected: "integer or null" }),
        // Numeric strings are coerced.
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ValidationError::WrongType { field: field.into(), expected: "integer or null" }),
        Some(_) => Err(ValidationError::WrongType { field: field.into(), expected: "integer or null" }),
    }
}

fn images_field(obj: &Map<String, Value>) -> Result<Vec<Image>, ValidationError> {
    let items = match obj.get("images") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::WrongType { field: "images".into(), expected: "list of images" }),
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let image = item.as_object().ok_or_else(|| ValidationError::WrongType {
                field: format!("images[{idx}]"),
                expected: "image object",
            })?;
            Ok(Image {
                url: check_url(&format!("images[{idx}].url"), string_field(image, "url")?)?,
                width: int_field(image, "width")?,
                height: int_field(image, "height")?,
            })
        })
        .collect()
}
