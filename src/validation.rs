// 2.0 validation.rs: the validation gate. every create, update, import row and publish
// runs a domain's rules through here. validation is pure: same payload, same result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// "field: message; field: message", for row-level reporting.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Collects field errors for one payload. Domains chain checks and call `finish`.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, condition: bool, field: &str, message: &str) -> &mut Self {
        if !condition {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, "is required")
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.errors
                .push(FieldError::new(field, format!("must be at most {max} characters")));
        }
        self
    }

    pub fn decimal_in_range(&mut self, field: &str, value: Decimal, min: Decimal, max: Decimal) -> &mut Self {
        if value < min || value > max {
            self.errors
                .push(FieldError::new(field, format!("must be between {min} and {max}")));
        }
        self
    }

    pub fn int_in_range(&mut self, field: &str, value: u64, min: u64, max: u64) -> &mut Self {
        if value < min || value > max {
            self.errors
                .push(FieldError::new(field, format!("must be between {min} and {max}")));
        }
        self
    }

    /// Thresholds travel as strings; they must parse as a positive decimal.
    pub fn positive_decimal_str(&mut self, field: &str, value: &str) -> Option<Decimal> {
        match Decimal::from_str(value.trim()) {
            Ok(parsed) if parsed > Decimal::ZERO => Some(parsed),
            Ok(_) => {
                self.errors.push(FieldError::new(field, "must be greater than zero"));
                None
            }
            Err(_) => {
                self.errors.push(FieldError::new(field, "must be a decimal number"));
                None
            }
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn finish(&mut self) -> ValidationResult {
        ValidationResult::from_errors(std::mem::take(&mut self.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_validator_is_valid() {
        let result = Validator::new().finish();
        assert!(result.is_valid());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn collects_every_failure() {
        let result = Validator::new()
            .required("name", "  ")
            .decimal_in_range("maker_rate", dec!(1.5), dec!(0), dec!(1))
            .int_in_range("vip_level", 3, 0, 10)
            .finish();

        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].field, "name");
        assert_eq!(result.summary(), "name: is required; maker_rate: must be between 0 and 1");
    }

    #[test]
    fn decimal_strings() {
        let mut v = Validator::new();
        assert_eq!(v.positive_decimal_str("threshold", "100.5"), Some(dec!(100.5)));
        assert_eq!(v.positive_decimal_str("threshold", "-1"), None);
        assert_eq!(v.positive_decimal_str("threshold", "abc"), None);
        let result = v.finish();
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[1].message, "must be a decimal number");
    }

    #[test]
    fn validation_is_idempotent() {
        let run = || {
            Validator::new()
                .max_len("title", "a very long title", 4)
                .finish()
        };
        assert_eq!(run(), run());
    }
}
