//! Validation of untrusted backend predictions.
//!
//! Each record is checked on its own: a malformed record is dropped and
//! reported, the rest of the batch goes through. Out-of-range confidence is
//! rejected rather than clamped.

use serde_json::{Map, Value};

use super::raw::RawDetection;
use super::result::{CanonicalDetection, ScalarId};
use super::taxonomy::Taxonomy;
use crate::error::{ValidationError, ValidationWarning};

const NUMERIC_FIELDS: [&str; 5] = ["x", "y", "width", "height", "confidence"];
const CLASS_FIELD: &str = "class";
const OPTIONAL_ID_FIELDS: [&str; 2] = ["class_id", "detection_id"];

/// Output of one normalization pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub detections: Vec<CanonicalDetection>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl Normalized {
    /// Number of input records that were dropped.
    pub fn rejected(&self) -> usize {
        let mut indices: Vec<usize> = self.errors.iter().map(|e| e.index).collect();
        indices.dedup();
        indices.len()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DetectionNormalizer {
    taxonomy: Taxonomy,
}

impl DetectionNormalizer {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn normalize(&self, raw: &[RawDetection]) -> Normalized {
        let mut out = Normalized::default();
        for (index, record) in raw.iter().enumerate() {
            match self.normalize_one(index, record, &mut out.warnings) {
                Ok(detection) => out.detections.push(detection),
                Err(mut errors) => {
                    for error in &errors {
                        log::warn!("dropping {}", error);
                    }
                    out.errors.append(&mut errors);
                }
            }
        }
        out
    }

    fn normalize_one(
        &self,
        index: usize,
        record: &RawDetection,
        warnings: &mut Vec<ValidationWarning>,
    ) -> Result<CanonicalDetection, Vec<ValidationError>> {
        let Some(fields) = record.as_value().as_object() else {
            return Err(vec![ValidationError {
                index,
                field: None,
                message: format!(
                    "record must be a JSON object, got {}",
                    type_name(record.as_value())
                ),
            }]);
        };

        let mut errors = Vec::new();
        let mut numbers = [0.0f64; NUMERIC_FIELDS.len()];
        for (slot, field) in numbers.iter_mut().zip(NUMERIC_FIELDS) {
            match numeric_field(fields, field) {
                Ok(value) => *slot = value,
                Err(message) => errors.push(field_error(index, field, message)),
            }
        }
        let [x, y, width, height, confidence] = numbers;

        // Range is checked only once the value is known to be numeric.
        if !errors.iter().any(|e| e.field.as_deref() == Some("confidence"))
            && !(0.0..=1.0).contains(&confidence)
        {
            errors.push(field_error(
                index,
                "confidence",
                format!("confidence {} out of range [0, 1]", confidence),
            ));
        }

        let class = match fields.get(CLASS_FIELD) {
            None => {
                errors.push(field_error(index, CLASS_FIELD, missing(CLASS_FIELD)));
                None
            }
            Some(Value::String(name)) if !name.trim().is_empty() => Some(name.clone()),
            Some(Value::String(_)) => {
                errors.push(field_error(index, CLASS_FIELD, "class must not be empty".into()));
                None
            }
            Some(other) => {
                errors.push(field_error(
                    index,
                    CLASS_FIELD,
                    format!("class must be a string, got {}", type_name(other)),
                ));
                None
            }
        };

        let [class_id, detection_id] =
            OPTIONAL_ID_FIELDS.map(|field| optional_id(fields, index, field, warnings));

        match class {
            Some(class) if errors.is_empty() => Ok(CanonicalDetection {
                x,
                y,
                width,
                height,
                confidence,
                category: self.taxonomy.classify(&class),
                class,
                class_id,
                detection_id,
            }),
            _ => Err(errors),
        }
    }
}

fn numeric_field(fields: &Map<String, Value>, field: &str) -> Result<f64, String> {
    match fields.get(field) {
        None => Err(missing(field)),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("{} is not representable as a float", field)),
        Some(other) => Err(format!("{} must be numeric, got {}", field, type_name(other))),
    }
}

fn optional_id(
    fields: &Map<String, Value>,
    index: usize,
    field: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<ScalarId> {
    match fields.get(field)? {
        Value::Number(n) => Some(ScalarId::Number(n.clone())),
        Value::String(s) => Some(ScalarId::Text(s.clone())),
        Value::Bool(b) => Some(ScalarId::Bool(*b)),
        other => {
            let warning = ValidationWarning {
                index,
                field: field.to_string(),
                message: format!("{} should be a scalar, got {}", field, type_name(other)),
            };
            log::warn!("prediction {}: {}; field dropped", index, warning.message);
            warnings.push(warning);
            None
        }
    }
}

fn field_error(index: usize, field: &str, message: String) -> ValidationError {
    ValidationError {
        index,
        field: Some(field.to_string()),
        message,
    }
}

fn missing(field: &str) -> String {
    format!("missing required field: {}", field)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
