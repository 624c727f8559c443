use bigdecimal::BigDecimal;
use std::fmt;

pub const PAYER_FIELD_MAX_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_amount(amount: &BigDecimal) -> ValidationResult {
    if *amount <= BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_payer_field(field: &'static str, value: &str) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, PAYER_FIELD_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn positive_amount_is_accepted() {
        assert!(validate_amount(&BigDecimal::from_str("100.50").unwrap()).is_ok());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = validate_amount(&BigDecimal::from(0)).unwrap_err();
        assert_eq!(err.field, "amount");
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(validate_amount(&BigDecimal::from_str("-50").unwrap()).is_err());
    }

    #[test]
    fn empty_payer_field_is_rejected() {
        assert!(validate_payer_field("phone", "  ").is_err());
    }

    #[test]
    fn overlong_payer_field_is_rejected() {
        let value = "x".repeat(PAYER_FIELD_MAX_LEN + 1);
        assert!(validate_payer_field("email", &value).is_err());
    }

    #[test]
    fn sanitize_collapses_whitespace_and_drops_controls() {
        assert_eq!(sanitize_string("  a \tb\u{0000}c  "), "a bc");
    }
}
