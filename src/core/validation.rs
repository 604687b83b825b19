//! Validation utilities for configuration and command-line values

use std::time::Duration;

/// A configuration or argument value that cannot be used
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn severity(&self) -> log::Level {
        log::Level::Error
    }

    fn is_transient(&self) -> bool {
        false
    }
}

/// Longest interval or timeout accepted from configuration
pub const MAX_SECONDS: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Parse a strictly positive number of seconds (fractions allowed)
pub fn validate_positive_seconds(field: &str, value: f64) -> Result<Duration, ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::new(&format!(
            "'{}' must be a positive number of seconds (got {})",
            field, value
        )));
    }
    bounded_duration(field, value)
}

/// Parse a non-negative number of seconds; zero disables the pause
pub fn validate_non_negative_seconds(
    field: &str,
    value: f64,
) -> Result<Duration, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(&format!(
            "'{}' cannot be negative (got {})",
            field, value
        )));
    }
    bounded_duration(field, value)
}

fn bounded_duration(field: &str, value: f64) -> Result<Duration, ValidationError> {
    let too_long = || {
        ValidationError::new(&format!(
            "'{}' cannot exceed {} seconds (got {})",
            field,
            MAX_SECONDS.as_secs(),
            value
        ))
    };
    let duration = Duration::try_from_secs_f64(value).map_err(|_| too_long())?;
    if duration > MAX_SECONDS {
        return Err(too_long());
    }
    Ok(duration)
}

/// Reject empty or whitespace-only text
pub fn validate_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(&format!("'{}' cannot be empty", field)));
    }
    Ok(trimmed)
}

/// Parse an absolute http(s) URL
pub fn validate_url(field: &str, value: &str) -> Result<url::Url, ValidationError> {
    let parsed = url::Url::parse(value.trim()).map_err(|e| {
        ValidationError::new(&format!("'{}' is not a valid URL '{}': {}", field, value, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ValidationError::new(&format!(
            "'{}' must use http or https (got '{}')",
            field, other
        ))),
    }
}

/// Normalise a plate number to the registry's upper-case form
///
/// Inner whitespace is removed; plates only carry letters and digits.
pub fn normalize_plate(value: &str) -> Result<String, ValidationError> {
    let plate: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if plate.is_empty() {
        return Err(ValidationError::new("Plate number cannot be empty"));
    }
    if !plate.chars().all(|c| c.is_alphanumeric()) {
        return Err(ValidationError::new(&format!(
            "Plate number '{}' may only contain letters and digits",
            value
        )));
    }
    Ok(plate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_seconds() {
        assert_eq!(
            validate_positive_seconds("poll-interval", 1800.0).unwrap(),
            Duration::from_secs(1800)
        );
        assert_eq!(
            validate_positive_seconds("rate-limit-delay", 0.5).unwrap(),
            Duration::from_millis(500)
        );
        assert!(validate_positive_seconds("poll-interval", 0.0).is_err());
        assert!(validate_positive_seconds("poll-interval", -3.0).is_err());
        assert!(validate_positive_seconds("poll-interval", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_non_negative_seconds() {
        assert_eq!(
            validate_non_negative_seconds("notify-delay", 0.0).unwrap(),
            Duration::ZERO
        );
        assert!(validate_non_negative_seconds("notify-delay", -0.1).is_err());
    }

    #[test]
    fn test_huge_seconds_are_rejected() {
        for value in [1e20, f64::MAX, MAX_SECONDS.as_secs_f64() + 1.0] {
            let err = validate_positive_seconds("poll-interval", value).unwrap_err();
            assert!(err.message().contains("cannot exceed"), "{}", err);
            assert!(validate_non_negative_seconds("rate-limit-delay", value).is_err());
        }
        assert_eq!(
            validate_positive_seconds("poll-interval", MAX_SECONDS.as_secs_f64()).unwrap(),
            MAX_SECONDS
        );
    }

    #[test]
    fn test_validate_non_empty() {
        assert_eq!(validate_non_empty("login", "  operator ").unwrap(), "operator");
        let err = validate_non_empty("login", "   ").unwrap_err();
        assert_eq!(err.message(), "'login' cannot be empty");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("base-url", "https://rbda.dc.tj").is_ok());
        assert!(validate_url("base-url", "ftp://rbda.dc.tj").is_err());
        assert!(validate_url("base-url", "not a url").is_err());
    }

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate("01abc123").unwrap(), "01ABC123");
        assert_eq!(normalize_plate(" 01 ABC 123 ").unwrap(), "01ABC123");
        assert!(normalize_plate("").is_err());
        assert!(normalize_plate("01-ABC").is_err());
    }
}
