//! Structural validation of request bodies.
//!
//! Bodies are checked against a declared [`Shape`] before anything is
//! deserialized, so every offending field is reported in one pass instead of
//! stopping at the first serde error.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// JSON type a field must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Boolean,
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind, required: false }
    }
}

/// Declared object shape for one operation
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    pub fields: &'static [FieldSpec],
}

/// One field-level problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: &'static str,
    pub expected: &'static str,
    pub received: &'static str,
    pub path: Vec<String>,
    pub message: String,
}

impl Issue {
    /// Root issue for a body the server refused to buffer
    pub fn unreadable_body(too_large: bool, message: impl Into<String>) -> Self {
        Issue {
            code: if too_large { "too_big" } else { "invalid_body" },
            expected: "object",
            received: "unknown",
            path: Vec::new(),
            message: message.into(),
        }
    }
}

/// Name of the JSON type of `value`, with `undefined` for a missing key
fn received(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

impl Shape {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Check `body` against the shape and return every violation.
    pub fn check(&self, body: &Value) -> Result<(), Vec<Issue>> {
        let object = match body {
            Value::Object(map) => map,
            other => {
                return Err(vec![Issue {
                    code: "invalid_type",
                    expected: "object",
                    received: received(Some(other)),
                    path: Vec::new(),
                    message: format!("Expected object, received {}", received(Some(other))),
                }])
            }
        };

        let issues: Vec<Issue> = self
            .fields
            .iter()
            .filter_map(|spec| Self::check_field(spec, object))
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    fn check_field(spec: &FieldSpec, object: &Map<String, Value>) -> Option<Issue> {
        let value = object.get(spec.name);
        match value {
            None if !spec.required => None,
            Some(v) if spec.kind.accepts(v) => None,
            None => Some(Issue {
                code: "invalid_type",
                expected: spec.kind.name(),
                received: "undefined",
                path: vec![spec.name.to_string()],
                message: "Required".to_string(),
            }),
            Some(v) => Some(Issue {
                code: "invalid_type",
                expected: spec.kind.name(),
                received: received(Some(v)),
                path: vec![spec.name.to_string()],
                message: format!("Expected {}, received {}", spec.kind.name(), received(Some(v))),
            }),
        }
    }

    /// Keep only declared keys so unknown input never reaches deserialization
    fn strip(&self, body: &Value) -> Value {
        let mut kept = Map::new();
        if let Value::Object(map) = body {
            for spec in self.fields {
                if let Some(v) = map.get(spec.name) {
                    kept.insert(spec.name.to_string(), v.clone());
                }
            }
        }
        Value::Object(kept)
    }

    /// Validate and deserialize into the operation's typed request.
    pub fn parse<T: DeserializeOwned>(&self, body: &Value) -> Result<T, Vec<Issue>> {
        self.check(body)?;
        serde_json::from_value(self.strip(body)).map_err(|e| {
            vec![Issue {
                code: "custom",
                expected: "object",
                received: "object",
                path: Vec::new(),
                message: e.to_string(),
            }]
        })
    }
}

/// Outcome of reading a raw request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Missing,
    Malformed(Issue),
    Json(Value),
}

/// Empty, whitespace-only and literal `null` bodies count as missing.
pub fn read_body(raw: &[u8]) -> Body {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Body::Missing;
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Null) => Body::Missing,
        Ok(value) => Body::Json(value),
        Err(e) => Body::Malformed(Issue {
            code: "invalid_json",
            expected: "object",
            received: "string",
            path: Vec::new(),
            message: e.to_string(),
        }),
    }
}
