use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// Maps one raw payload field of a device to a named sensor.
///
/// Optional bounds gate live decoding: values outside
/// `[min_limit, max_limit]` are dropped from the decoded map, never
/// surfaced as errors. Boolean sensors coerce truthiness to 0/1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSensorBinding {
    pub device_id: String,
    /// Raw payload field name, e.g. "field3".
    pub field_name: String,
    /// Ordering key for stable rendering, ascending.
    pub field_number: u32,
    pub sensor_name: String,
    pub min_limit: Option<f64>,
    pub max_limit: Option<f64>,
    pub is_boolean: bool,
}

impl FieldSensorBinding {
    /// Whether a numeric value passes this binding's bounds.
    pub fn within_limits(&self, value: f64) -> bool {
        self.min_limit.map_or(true, |min| value >= min)
            && self.max_limit.map_or(true, |max| value <= max)
    }
}

/// Input for assigning a binding to a device
#[derive(Debug, Clone, PartialEq)]
pub struct CreateBindingInput {
    pub device_id: String,
    pub field_name: String,
    pub field_number: u32,
    pub sensor_name: String,
    pub min_limit: Option<f64>,
    pub max_limit: Option<f64>,
    pub is_boolean: bool,
}

/// Input for listing a device's bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBindingsInput {
    pub device_id: String,
}

/// Validate that `candidate` does not collide with a device's existing
/// bindings: field names unique, sensor assignments unique.
pub fn validate_binding_uniqueness(
    existing: &[FieldSensorBinding],
    candidate: &CreateBindingInput,
) -> DomainResult<()> {
    for binding in existing {
        if binding.field_name == candidate.field_name {
            return Err(DomainError::DuplicateFieldBinding {
                device_id: candidate.device_id.clone(),
                field_name: candidate.field_name.clone(),
            });
        }
        if binding.sensor_name == candidate.sensor_name {
            return Err(DomainError::DuplicateSensorBinding {
                device_id: candidate.device_id.clone(),
                sensor_name: candidate.sensor_name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(field: &str, sensor: &str) -> FieldSensorBinding {
        FieldSensorBinding {
            device_id: "dev-1".to_string(),
            field_name: field.to_string(),
            field_number: 1,
            sensor_name: sensor.to_string(),
            min_limit: None,
            max_limit: None,
            is_boolean: false,
        }
    }

    fn candidate(field: &str, sensor: &str) -> CreateBindingInput {
        CreateBindingInput {
            device_id: "dev-1".to_string(),
            field_name: field.to_string(),
            field_number: 2,
            sensor_name: sensor.to_string(),
            min_limit: None,
            max_limit: None,
            is_boolean: false,
        }
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let existing = vec![binding("field1", "temp")];
        let result = validate_binding_uniqueness(&existing, &candidate("field1", "humidity"));
        assert!(matches!(
            result,
            Err(DomainError::DuplicateFieldBinding { .. })
        ));
    }

    #[test]
    fn test_duplicate_sensor_rejected() {
        let existing = vec![binding("field1", "temp")];
        let result = validate_binding_uniqueness(&existing, &candidate("field2", "temp"));
        assert!(matches!(
            result,
            Err(DomainError::DuplicateSensorBinding { .. })
        ));
    }

    #[test]
    fn test_distinct_binding_accepted() {
        let existing = vec![binding("field1", "temp")];
        assert!(validate_binding_uniqueness(&existing, &candidate("field2", "humidity")).is_ok());
    }

    #[test]
    fn test_within_limits() {
        let mut b = binding("field1", "temp");
        b.min_limit = Some(0.0);
        b.max_limit = Some(100.0);
        assert!(b.within_limits(42.0));
        assert!(b.within_limits(0.0));
        assert!(b.within_limits(100.0));
        assert!(!b.within_limits(-1.0));
        assert!(!b.within_limits(150.0));
    }

    #[test]
    fn test_absent_bound_is_unbounded() {
        let b = binding("field1", "temp");
        assert!(b.within_limits(f64::MAX));
        assert!(b.within_limits(f64::MIN));
    }
}
