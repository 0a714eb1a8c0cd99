use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

const FORMAT_DATE: &str = "date";
const FORMAT_DATE_TIME: &str = "date-time";
const FORMAT_TIME: &str = "time";
const FORMAT_EMAIL: &str = "email";
const FORMAT_URI: &str = "uri";

/// The JSON type a filter constrains its value to.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// A numeric bound that may be written as a number or a numeric string.
///
/// Definitions in the wild carry both `"minimum": 18` and `"minimum": "18"`;
/// the two are equivalent for comparison purposes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum OneOfNumberString {
    Number(f64),
    String(String),
}

impl OneOfNumberString {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

/// The outcome of evaluating a [Filter] against one extracted value.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub matched: bool,
    pub value: Value,
}

/// The JSON Schema subset used by presentation definition constraint fields
/// to evaluate the values returned from a field's JSONPath expressions.
///
/// Unknown keywords are ignored on deserialization, keeping the engine
/// forward-compatible with richer schemas. Evaluation is total: a type
/// mismatch or an unparseable `pattern` yields a non-match, never an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    schema_type: Option<SchemaType>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    const_value: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format_minimum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format_maximum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format_exclusive_minimum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format_exclusive_maximum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<OneOfNumberString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximum: Option<OneOfNumberString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusive_minimum: Option<OneOfNumberString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusive_maximum: Option<OneOfNumberString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    not: Option<Box<Filter>>,
}

impl Filter {
    /// Evaluate the filter against a value extracted from a credential.
    pub fn evaluate(&self, value: &Value) -> FilterOutcome {
        FilterOutcome {
            matched: self.matches(value),
            value: value.clone(),
        }
    }

    /// Whether a value satisfies every keyword of the filter.
    ///
    /// Keywords follow JSON Schema applicability: string keywords only
    /// constrain strings, numeric keywords only numbers; the `type` keyword
    /// is what rejects values of the wrong shape.
    pub fn matches(&self, value: &Value) -> bool {
        if let Some(schema_type) = self.schema_type {
            if !type_matches(schema_type, value) {
                return false;
            }
        }

        if let Some(const_value) = &self.const_value {
            if value != const_value {
                return false;
            }
        }

        if let Some(enum_values) = &self.enum_values {
            if !enum_values.contains(value) {
                return false;
            }
        }

        if let Some(s) = value.as_str() {
            if !self.string_keywords_match(s) {
                return false;
            }
        }

        if let Some(n) = value.as_f64() {
            if !self.numeric_keywords_match(n) {
                return false;
            }
        }

        if let Some(not) = &self.not {
            if not.matches(value) {
                return false;
            }
        }

        true
    }

    fn string_keywords_match(&self, s: &str) -> bool {
        if let Some(pattern) = &self.pattern {
            let matched = Regex::new(pattern)
                .map(|re| re.is_match(s))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }

        if let Some(min_length) = self.min_length {
            if s.chars().count() < min_length {
                return false;
            }
        }

        if let Some(max_length) = self.max_length {
            if s.chars().count() > max_length {
                return false;
            }
        }

        if let Some(format) = &self.format {
            if !self.format_matches(format, s) {
                return false;
            }
        }

        true
    }

    fn format_matches(&self, format: &str, s: &str) -> bool {
        let valid = match format {
            FORMAT_DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            FORMAT_DATE_TIME => DateTime::parse_from_rfc3339(s).is_ok(),
            FORMAT_TIME => is_rfc3339_time(s),
            FORMAT_EMAIL => email_regex().is_match(s),
            FORMAT_URI => Url::parse(s).is_ok(),
            // Unrecognized format values are ignored.
            _ => return true,
        };

        if !valid {
            return false;
        }

        // ISO-8601 renders dates and times in lexicographic order, so the
        // bounds are plain string comparisons.
        if matches!(format, FORMAT_DATE | FORMAT_DATE_TIME | FORMAT_TIME) {
            if let Some(minimum) = &self.format_minimum {
                if s < minimum.as_str() {
                    return false;
                }
            }
            if let Some(maximum) = &self.format_maximum {
                if s > maximum.as_str() {
                    return false;
                }
            }
            if let Some(exclusive_minimum) = &self.format_exclusive_minimum {
                if s <= exclusive_minimum.as_str() {
                    return false;
                }
            }
            if let Some(exclusive_maximum) = &self.format_exclusive_maximum {
                if s >= exclusive_maximum.as_str() {
                    return false;
                }
            }
        }

        true
    }

    fn numeric_keywords_match(&self, n: f64) -> bool {
        if let Some(minimum) = self.minimum.as_ref().and_then(OneOfNumberString::as_f64) {
            if n < minimum {
                return false;
            }
        }
        if let Some(maximum) = self.maximum.as_ref().and_then(OneOfNumberString::as_f64) {
            if n > maximum {
                return false;
            }
        }
        if let Some(exclusive_minimum) = self
            .exclusive_minimum
            .as_ref()
            .and_then(OneOfNumberString::as_f64)
        {
            if n <= exclusive_minimum {
                return false;
            }
        }
        if let Some(exclusive_maximum) = self
            .exclusive_maximum
            .as_ref()
            .and_then(OneOfNumberString::as_f64)
        {
            if n >= exclusive_maximum {
                return false;
            }
        }

        true
    }

    /// Whether the filter carries a `pattern` keyword that fails to compile.
    ///
    /// Evaluation treats an unparseable pattern as a non-match; definition
    /// validation surfaces it as an error instead.
    pub fn has_invalid_pattern(&self) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| Regex::new(pattern).is_err())
    }
}

fn type_matches(schema_type: SchemaType, value: &Value) -> bool {
    match schema_type {
        SchemaType::String => value.is_string(),
        SchemaType::Number => value.is_number(),
        SchemaType::Integer => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Array => value.is_array(),
        SchemaType::Object => value.is_object(),
        SchemaType::Null => value.is_null(),
    }
}

fn is_rfc3339_time(s: &str) -> bool {
    // A full-time has an offset; graft it onto an arbitrary date to reuse the
    // RFC 3339 parser. A partial-time without offset is accepted too.
    DateTime::parse_from_rfc3339(&format!("1970-01-01T{s}")).is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"))
}
