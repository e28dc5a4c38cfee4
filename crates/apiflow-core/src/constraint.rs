//! Constraints restricting the domain of a parameter.
//!
//! A `Constraint` is a single restriction on an otherwise free value: an
//! enumeration of allowed values, a regular expression, or a numeric, length,
//! item-count or property-count bound. Every variant can `validate` a
//! candidate value; most can also `generate` an example that satisfies it.
//!
//! Constraints are immutable values. Parameters hold them in declaration
//! order and decide which one drives generation.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::{Error, Result};

/// A single restriction on the value of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Constraint {
    /// The value must equal one of the listed members
    Enum(Vec<JsonValue>),
    /// The value must match the regular expression
    Pattern(Pattern),
    Minimum(f64),
    Maximum(f64),
    ExclusiveMinimum(f64),
    ExclusiveMaximum(f64),
    MultipleOf(f64),
    /// Character count for strings, item count for arrays
    MinimumLength(usize),
    MaximumLength(usize),
    MinimumItems(usize),
    MaximumItems(usize),
    UniqueItems(bool),
    MinimumProperties(usize),
    MaximumProperties(usize),
}

impl Constraint {
    /// Build an enumeration constraint from anything convertible to JSON values
    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Build a pattern constraint, failing if the expression does not compile
    pub fn pattern(expression: impl Into<String>) -> Result<Self> {
        Ok(Self::Pattern(Pattern::new(expression)?))
    }

    /// JSON-schema keyword for this constraint
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enum(_) => "enum",
            Self::Pattern(_) => "pattern",
            Self::Minimum(_) => "minimum",
            Self::Maximum(_) => "maximum",
            Self::ExclusiveMinimum(_) => "exclusiveMinimum",
            Self::ExclusiveMaximum(_) => "exclusiveMaximum",
            Self::MultipleOf(_) => "multipleOf",
            Self::MinimumLength(_) => "minLength",
            Self::MaximumLength(_) => "maxLength",
            Self::MinimumItems(_) => "minItems",
            Self::MaximumItems(_) => "maxItems",
            Self::UniqueItems(_) => "uniqueItems",
            Self::MinimumProperties(_) => "minProperties",
            Self::MaximumProperties(_) => "maxProperties",
        }
    }

    /// Members of an `Enum` constraint, `None` for every other variant
    pub fn enum_values(&self) -> Option<&[JsonValue]> {
        match self {
            Self::Enum(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Self::Enum(_))
    }

    /// Keyword and value of this constraint in a JSON-schema object
    pub fn to_json_schema(&self) -> (&'static str, JsonValue) {
        let value = match self {
            Self::Enum(values) => JsonValue::Array(values.clone()),
            Self::Pattern(pattern) => JsonValue::String(pattern.as_str().to_string()),
            Self::Minimum(n)
            | Self::Maximum(n)
            | Self::ExclusiveMinimum(n)
            | Self::ExclusiveMaximum(n)
            | Self::MultipleOf(n) => number_value(*n),
            Self::MinimumLength(n)
            | Self::MaximumLength(n)
            | Self::MinimumItems(n)
            | Self::MaximumItems(n)
            | Self::MinimumProperties(n)
            | Self::MaximumProperties(n) => JsonValue::from(*n as u64),
            Self::UniqueItems(unique) => JsonValue::Bool(*unique),
        };
        (self.name(), value)
    }

    /// Whether `candidate` satisfies this constraint
    pub fn validate(&self, candidate: &JsonValue) -> bool {
        match self {
            Self::Enum(values) => values.contains(candidate),
            Self::Pattern(pattern) => pattern.matches(candidate),
            Self::Minimum(n) => numeric_value(candidate).is_some_and(|v| v >= *n),
            Self::Maximum(n) => numeric_value(candidate).is_some_and(|v| v <= *n),
            Self::ExclusiveMinimum(n) => numeric_value(candidate).is_some_and(|v| v > *n),
            Self::ExclusiveMaximum(n) => numeric_value(candidate).is_some_and(|v| v < *n),
            Self::MultipleOf(n) => {
                *n != 0.0 && numeric_value(candidate).is_some_and(|v| (v % n).abs() < 1e-9)
            }
            Self::MinimumLength(n) => length_of(candidate).is_some_and(|len| len >= *n),
            Self::MaximumLength(n) => length_of(candidate).is_some_and(|len| len <= *n),
            Self::MinimumItems(n) => candidate.as_array().is_some_and(|items| items.len() >= *n),
            Self::MaximumItems(n) => candidate.as_array().is_some_and(|items| items.len() <= *n),
            Self::UniqueItems(false) => true,
            Self::UniqueItems(true) => candidate.as_array().is_some_and(|items| {
                items
                    .iter()
                    .enumerate()
                    .all(|(i, item)| !items[..i].contains(item))
            }),
            Self::MinimumProperties(n) => {
                candidate.as_object().is_some_and(|map| map.len() >= *n)
            }
            Self::MaximumProperties(n) => {
                candidate.as_object().is_some_and(|map| map.len() <= *n)
            }
        }
    }

    /// Produce an example value satisfying this constraint.
    ///
    /// `Enum` picks a member uniformly at random on every call; bounds return
    /// the bound itself (or its nearest neighbour for exclusive bounds).
    /// Upper length and item bounds yield an empty value; lower ones above
    /// `MAX_GENERATED_SIZE` are ungenerable.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<JsonValue> {
        match self {
            Self::Enum(values) => values
                .choose(rng)
                .cloned()
                .ok_or_else(|| Error::ungenerable("enum has no members")),
            Self::Pattern(pattern) => pattern.generate(),
            Self::Minimum(n) | Self::Maximum(n) | Self::MultipleOf(n) => Ok(number_value(*n)),
            Self::ExclusiveMinimum(n) => Ok(number_value(n + 1.0)),
            Self::ExclusiveMaximum(n) => Ok(number_value(n - 1.0)),
            Self::MaximumLength(_) => Ok(JsonValue::String(String::new())),
            Self::MinimumLength(n) => {
                check_generated_size(*n, "characters")?;
                Ok(JsonValue::String("a".repeat(*n)))
            }
            Self::MinimumItems(n) => {
                check_generated_size(*n, "items")?;
                Ok(JsonValue::Array(vec![JsonValue::Null; *n]))
            }
            Self::MaximumItems(_) | Self::UniqueItems(_) => Ok(JsonValue::Array(Vec::new())),
            Self::MinimumProperties(0) | Self::MaximumProperties(_) => {
                Ok(JsonValue::Object(JsonMap::new()))
            }
            Self::MinimumProperties(n) => Err(Error::ungenerable(format!(
                "cannot invent {} object properties",
                n
            ))),
        }
    }
}

/// Largest string or array a lower bound may force `generate` to build
pub const MAX_GENERATED_SIZE: usize = 4096;

fn check_generated_size(n: usize, unit: &str) -> Result<()> {
    if n > MAX_GENERATED_SIZE {
        return Err(Error::ungenerable(format!(
            "refusing to build an example of {} {}",
            n, unit
        )));
    }
    Ok(())
}

/// A compiled regular expression that compares and serializes by its source text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(expression: impl Into<String>) -> Result<Self> {
        let source = expression.into();
        let regex = Regex::new(&source).map_err(|e| Error::InvalidPattern {
            pattern: source.clone(),
            source: e,
        })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Strings are matched directly, numbers and booleans by their text form
    pub fn matches(&self, candidate: &JsonValue) -> bool {
        match candidate {
            JsonValue::String(s) => self.regex.is_match(s),
            JsonValue::Number(n) => self.regex.is_match(&n.to_string()),
            JsonValue::Bool(b) => self.regex.is_match(&b.to_string()),
            _ => false,
        }
    }

    /// Only patterns that reduce to plain literal text can be generated
    fn generate(&self) -> Result<JsonValue> {
        let body = self.source.strip_prefix('^').unwrap_or(&self.source);
        let body = body.strip_suffix('$').unwrap_or(body);

        if body.chars().any(is_regex_meta) {
            return Err(Error::ungenerable(format!(
                "no example synthesis for pattern {:?}",
                self.source
            )));
        }

        let literal = JsonValue::String(body.to_string());
        if self.matches(&literal) {
            Ok(literal)
        } else {
            Err(Error::ungenerable(format!(
                "literal {:?} does not satisfy pattern {:?}",
                body, self.source
            )))
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(source).map_err(serde::de::Error::custom)
    }
}

fn is_regex_meta(c: char) -> bool {
    matches!(
        c,
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
    )
}

/// Numeric reading of a value: JSON numbers, or strings that parse as a finite number
pub(crate) fn numeric_value(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn length_of(value: &JsonValue) -> Option<usize> {
    match value {
        JsonValue::String(s) => Some(s.chars().count()),
        JsonValue::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Integral bounds stay integers in JSON output
pub(crate) fn number_value(n: f64) -> JsonValue {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}
