//! Garde validation utilities.

use crate::error::DomainError;
use garde::{Report, Validate};

/// Convert a garde validation report to `DomainError::ValidationError`
pub fn validate_struct<T>(value: &T) -> Result<(), DomainError>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| DomainError::ValidationError(format_validation_errors(&report)))
}

/// Format validation errors from a garde Report into a readable string
fn format_validation_errors(report: &Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            if path.to_string().is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", path, error.message())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use garde::Validate;

    #[derive(Validate)]
    struct TestRequest {
        #[garde(length(min = 1))]
        field: String,
    }

    #[test]
    fn test_validate_success() {
        let request = TestRequest {
            field: "value".to_string(),
        };
        assert!(validate_struct(&request).is_ok());
    }

    #[test]
    fn test_validate_failure_names_field() {
        let request = TestRequest {
            field: "".to_string(),
        };
        match validate_struct(&request) {
            Err(DomainError::ValidationError(msg)) => assert!(msg.contains("field")),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }
}
