use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Accepts absolute http(s) URLs only.
pub fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| invalid(field, value, format!("Invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field, value, format!("Unsupported URL scheme: {}", scheme))),
    }
}

/// Rejects blank text and text with NUL bytes (unusable as header values or paths).
pub fn validate_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Value cannot be empty"));
    }
    if value.contains('\0') {
        return Err(invalid(field, value.escape_default(), "Value contains NUL bytes"));
    }
    Ok(())
}

pub fn validate_at_least(field: &str, value: u64, min: u64) -> Result<()> {
    if value < min {
        return Err(invalid(field, value, format!("Value must be at least {}", min)));
    }
    Ok(())
}

/// Inclusive bounds.
pub fn validate_between(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(invalid(field, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}

/// 日期參數格式為 ddmmyyyy（例如 04102025）
pub fn validate_listing_date(field: &str, value: &str) -> Result<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, value, "Expected exactly 8 digits in ddmmyyyy format"));
    }
    NaiveDate::parse_from_str(value, "%d%m%Y")
        .map_err(|_| invalid(field, value, "Not a valid calendar date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_url() {
        assert!(validate_http_url("api.base_url", "https://api.mercadopublico.cl/x.json").is_ok());
        assert!(validate_http_url("api.base_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_http_url("api.base_url", "").is_err());
        assert!(validate_http_url("api.base_url", "not-a-url").is_err());
        assert!(validate_http_url("api.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_text() {
        assert!(validate_text("output.base_dir", "data").is_ok());
        assert!(validate_text("output.base_dir", "   ").is_err());

        let err = validate_text("output.base_dir", "da\0ta").unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(validate_at_least("retry.max_retries", 5, 1).is_ok());
        assert!(validate_at_least("retry.max_retries", 0, 1).is_err());

        assert!(validate_between("retry.backoff_base", 2.0, 0.001, 60.0).is_ok());
        assert!(validate_between("retry.backoff_base", 60.0, 0.001, 60.0).is_ok());
        assert!(validate_between("retry.backoff_base", 0.0, 0.001, 60.0).is_err());
        assert!(validate_between("retry.backoff_base", f64::NAN, 0.001, 60.0).is_err());
    }

    #[test]
    fn test_listing_date() {
        let date = validate_listing_date("fecha", "04102025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 4).unwrap());

        assert!(validate_listing_date("fecha", "4102025").is_err());
        assert!(validate_listing_date("fecha", "2025-10-04").is_err());
        assert!(validate_listing_date("fecha", "31022025").is_err());
        assert!(validate_listing_date("fecha", "0410202a").is_err());
    }
}
