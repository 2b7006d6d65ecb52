//! JSON Schema validation for model responses.
//!
//! Per-clause, legal mapping, and next-steps responses must match a fixed
//! shape before they are trusted. The schemas live in `schemas/` and are
//! embedded at compile time; each is compiled once and reused.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::extract::JsonObject;

const RISK_SCHEMA_JSON: &str = include_str!("../schemas/risk.schema.json");
const SIMPLIFICATION_SCHEMA_JSON: &str = include_str!("../schemas/simplification.schema.json");
const LAW_MAPPING_SCHEMA_JSON: &str = include_str!("../schemas/law_mapping.schema.json");
const NEXT_STEPS_SCHEMA_JSON: &str = include_str!("../schemas/next_steps.schema.json");

/// Compiled validators, indexed by [`ResponseShape::index`].
static COMPILED: [OnceLock<Result<jsonschema::Validator, String>>; 4] =
    [OnceLock::new(), OnceLock::new(), OnceLock::new(), OnceLock::new()];

/// A response shape with an embedded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseShape {
    Risk,
    Simplification,
    LawMapping,
    NextSteps,
}

impl ResponseShape {
    pub const ALL: [ResponseShape; 4] = [
        ResponseShape::Risk,
        ResponseShape::Simplification,
        ResponseShape::LawMapping,
        ResponseShape::NextSteps,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResponseShape::Risk => "risk",
            ResponseShape::Simplification => "simplification",
            ResponseShape::LawMapping => "law_mapping",
            ResponseShape::NextSteps => "next_steps",
        }
    }

    fn index(&self) -> usize {
        match self {
            ResponseShape::Risk => 0,
            ResponseShape::Simplification => 1,
            ResponseShape::LawMapping => 2,
            ResponseShape::NextSteps => 3,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            ResponseShape::Risk => RISK_SCHEMA_JSON,
            ResponseShape::Simplification => SIMPLIFICATION_SCHEMA_JSON,
            ResponseShape::LawMapping => LAW_MAPPING_SCHEMA_JSON,
            ResponseShape::NextSteps => NEXT_STEPS_SCHEMA_JSON,
        }
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed response that does not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Failed to load {shape} schema: {message}")]
    SchemaLoad {
        shape: ResponseShape,
        message: String,
    },

    #[error("{shape} response violates schema: {}", .errors.join("; "))]
    Violations {
        shape: ResponseShape,
        errors: Vec<String>,
    },

    #[error("{shape} response could not be decoded: {message}")]
    Decode {
        shape: ResponseShape,
        message: String,
    },
}

fn get_validator(shape: ResponseShape) -> Result<&'static jsonschema::Validator, ValidationError> {
    let result = COMPILED[shape.index()].get_or_init(|| {
        let schema_value: Value = match serde_json::from_str(shape.source()) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(message) => Err(ValidationError::SchemaLoad {
            shape,
            message: message.clone(),
        }),
    }
}

/// Validate a response value against its shape's schema.
pub fn validate_response(shape: ResponseShape, value: &Value) -> Result<(), ValidationError> {
    let validator = get_validator(shape)?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Violations { shape, errors })
    }
}

/// Validate an extracted object and decode it into its typed form.
pub fn decode_response<T: DeserializeOwned>(
    shape: ResponseShape,
    object: JsonObject,
) -> Result<T, ValidationError> {
    let value = Value::Object(object);
    validate_response(shape, &value)?;
    serde_json::from_value(value).map_err(|e| ValidationError::Decode {
        shape,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_schemas_compile() {
        for shape in ResponseShape::ALL {
            assert!(get_validator(shape).is_ok(), "{} schema failed to compile", shape);
        }
    }

    #[test]
    fn test_valid_risk_passes() {
        let value = json!({"risk_level": "High", "reason": "Penalty is 2% per day", "flags": ["excessive penalty"]});
        assert!(validate_response(ResponseShape::Risk, &value).is_ok());
    }

    #[test]
    fn test_unknown_risk_level_fails() {
        let value = json!({"risk_level": "Severe", "reason": "", "flags": []});
        let err = validate_response(ResponseShape::Risk, &value).unwrap_err();
        assert!(matches!(err, ValidationError::Violations { shape: ResponseShape::Risk, .. }));
    }

    #[test]
    fn test_non_list_flags_fail() {
        let value = json!({"risk_level": "Low", "reason": "", "flags": "none"});
        assert!(validate_response(ResponseShape::Risk, &value).is_err());
    }

    #[test]
    fn test_missing_simplification_key_fails() {
        let value = json!({"simple_explanation_en": "You pay rent monthly.", "why_it_matters": ""});
        let err = validate_response(ResponseShape::Simplification, &value).unwrap_err();
        assert!(err.to_string().contains("simple_explanation_hi"));
    }

    #[test]
    fn test_laws_must_be_a_list() {
        assert!(validate_response(ResponseShape::LawMapping, &json!({"laws": []})).is_ok());
        assert!(validate_response(ResponseShape::LawMapping, &json!({"laws": {}})).is_err());
        assert!(validate_response(ResponseShape::LawMapping, &json!({})).is_err());
    }

    #[test]
    fn test_next_steps_items_are_strings() {
        assert!(validate_response(ResponseShape::NextSteps, &json!({"next_steps": ["a"]})).is_ok());
        assert!(validate_response(ResponseShape::NextSteps, &json!({"next_steps": [1]})).is_err());
    }
}
