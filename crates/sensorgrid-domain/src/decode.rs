use crate::binding::FieldSensorBinding;
use serde_json::{Map, Value};
use tracing::debug;

/// Best-effort decode of a raw payload into `{sensor_name: value}`.
///
/// For each binding whose field is present in the payload and whose
/// numeric value passes the binding's bounds, emits the sensor name and
/// value. Boolean-flagged sensors coerce to a 0/1 integer. Missing and
/// out-of-range fields are dropped silently: partial data never blocks
/// delivery of the rest of the reading, and an empty result is a valid
/// "nothing to publish" outcome, not an error.
pub fn decode_payload(
    bindings: &[FieldSensorBinding],
    payload: &Map<String, Value>,
) -> Map<String, Value> {
    let mut decoded = Map::new();

    for binding in bindings {
        let Some(raw) = payload.get(&binding.field_name) else {
            continue;
        };
        let Some(numeric) = numeric_value(raw) else {
            debug!(
                device_id = %binding.device_id,
                field = %binding.field_name,
                "Skipping non-numeric payload field"
            );
            continue;
        };
        if !binding.within_limits(numeric) {
            debug!(
                device_id = %binding.device_id,
                field = %binding.field_name,
                value = numeric,
                "Dropping out-of-range reading"
            );
            continue;
        }

        let value = if binding.is_boolean {
            Value::from(u8::from(numeric != 0.0))
        } else {
            raw.clone()
        };
        decoded.insert(binding.sensor_name.clone(), value);
    }

    decoded
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
