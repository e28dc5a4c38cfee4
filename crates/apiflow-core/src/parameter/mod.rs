//! Parameters: named, typed value carriers with an ordered list of constraints.
//!
//! A `Parameter` is the atomic unit of the model. Format parsers build one per
//! request field (header, query entry, body entry, URL component) and
//! serializers ask it for an example value with [`Parameter::generate`], for
//! its whole declared domain with [`Parameter::declared_values`], or for a
//! JSON-schema rendering with [`Parameter::to_json_schema`].
//!
//! Parameters are never mutated in place: the `with_*` methods and
//! [`Parameter::merge`] all produce new instances.
//!
//! # Examples
//!
//! ```
//! use apiflow_core::{Constraint, Parameter, ParameterType};
//! use serde_json::json;
//!
//! let ports = Parameter::keyed("port")
//!     .with_type(ParameterType::String)
//!     .with_internals(vec![Constraint::enumeration(["8080", "443"])]);
//! let other = Parameter::keyed("port")
//!     .with_internals(vec![Constraint::enumeration(["80"])]);
//!
//! let merged = ports.merge(&other).unwrap();
//! assert_eq!(merged.declared_values(), vec![json!("80"), json!("443"), json!("8080")]);
//! ```

mod merge;
mod schema;

pub use merge::{merge_values, union_preserving_order};

use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::constraint::Constraint;
use crate::{Error, Result};

/// Type tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    /// Opaque pointer to an external definition, passed through unchanged
    Reference,
    /// A value assembled from several parts, such as a template string
    Multi,
    Array,
    Object,
}

/// A named value together with the constraints describing its domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<JsonValue>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<ParameterType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    internals: Vec<Constraint>,
    /// Contextual constraints; never used for generation
    externals: Vec<Parameter>,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<JsonValue>,
}

impl Parameter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parameter identified by `key`
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// A string parameter that can only ever be `text`
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            kind: Some(ParameterType::String),
            internals: vec![Constraint::Enum(vec![JsonValue::String(text.into())])],
            ..Self::default()
        }
    }

    /// A string parameter whose value is one of `choices`
    pub fn one_of<I, S>(key: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: Some(key.into()),
            kind: Some(ParameterType::String),
            internals: vec![Constraint::Enum(
                choices
                    .into_iter()
                    .map(|choice| JsonValue::String(choice.into()))
                    .collect(),
            )],
            ..Self::default()
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> Option<&JsonValue> {
        self.value.as_ref()
    }

    pub fn kind(&self) -> Option<ParameterType> {
        self.kind
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn internals(&self) -> &[Constraint] {
        &self.internals
    }

    pub fn externals(&self) -> &[Parameter] {
        &self.externals
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn example(&self) -> Option<&JsonValue> {
        self.example.as_ref()
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<JsonValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn without_value(mut self) -> Self {
        self.value = None;
        self
    }

    #[must_use]
    pub fn with_type(mut self, kind: ParameterType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_internals(mut self, internals: Vec<Constraint>) -> Self {
        self.internals = internals;
        self
    }

    /// Append one constraint after the existing ones
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.internals.push(constraint);
        self
    }

    #[must_use]
    pub fn with_externals(mut self, externals: Vec<Parameter>) -> Self {
        self.externals = externals;
        self
    }

    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<JsonValue>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Generate an example value using the thread-local random source
    pub fn generate(&self, use_default: bool) -> JsonValue {
        self.generate_with(use_default, &mut rand::thread_rng())
    }

    /// Generate an example value.
    ///
    /// With `use_default`, an explicit value is returned verbatim. Otherwise an
    /// `Enum` constraint drives generation when present, then the other
    /// constraints in order. The first example that passes `validate` wins;
    /// when none does, the first example produced is kept. Without any
    /// generable constraint the explicit value is used, and failing that a
    /// type-appropriate empty value.
    pub fn generate_with<R: Rng + ?Sized>(&self, use_default: bool, rng: &mut R) -> JsonValue {
        if use_default {
            if let Some(value) = &self.value {
                return value.clone();
            }
        }

        let enums = self.internals.iter().filter(|c| c.is_enum());
        let others = self.internals.iter().filter(|c| !c.is_enum());
        let mut first_candidate = None;
        for constraint in enums.chain(others) {
            match constraint.generate(rng) {
                Ok(value) if self.validate(&value) => return value,
                Ok(value) => {
                    trace!(
                        "{} constraint of parameter {:?} produced {} which fails validation",
                        constraint.name(),
                        self.key,
                        value
                    );
                    first_candidate.get_or_insert(value);
                }
                Err(e) => trace!(
                    "Skipping {} constraint of parameter {:?}: {}",
                    constraint.name(),
                    self.key,
                    e
                ),
            }
        }

        first_candidate
            .or_else(|| self.value.clone())
            .unwrap_or_else(|| self.empty_value())
    }

    /// Empty placeholder matching the parameter type
    pub fn empty_value(&self) -> JsonValue {
        match self.kind {
            None | Some(ParameterType::String) | Some(ParameterType::Multi) => {
                JsonValue::String(String::new())
            }
            Some(ParameterType::Array) => JsonValue::Array(Vec::new()),
            Some(ParameterType::Object) => JsonValue::Object(serde_json::Map::new()),
            Some(ParameterType::Number)
            | Some(ParameterType::Integer)
            | Some(ParameterType::Boolean)
            | Some(ParameterType::Reference) => JsonValue::Null,
        }
    }

    /// The whole declared domain rather than one example: the members of the
    /// `Enum` constraint, else the explicit value, else nothing.
    pub fn declared_values(&self) -> Vec<JsonValue> {
        if let Some(values) = self.internals.iter().find_map(Constraint::enum_values) {
            return values.to_vec();
        }
        self.value.iter().cloned().collect()
    }

    /// Whether `value` satisfies every internal constraint
    pub fn validate(&self, value: &JsonValue) -> bool {
        self.internals.iter().all(|c| c.validate(value))
    }

    /// Whether `candidate` fits the context described by `externals`.
    ///
    /// Without externals every candidate fits. Otherwise at least one external
    /// with the candidate's key must accept the candidate's value.
    pub fn is_valid(&self, candidate: &Parameter) -> bool {
        if self.externals.is_empty() {
            return true;
        }

        let value = candidate.value.clone().unwrap_or(JsonValue::Null);
        self.externals
            .iter()
            .filter(|external| external.key == candidate.key)
            .any(|external| external.validate(&value))
    }

    /// Combine two descriptions of the same field into one covering both.
    ///
    /// Both sides must share a key. `Enum` members are unioned, deduplicated
    /// and sorted (numerically when every member is numeric); other
    /// constraints are unioned. Conflicting explicit values are folded into
    /// the merged `Enum`. Metadata comes from `self` first, then `other`.
    pub fn merge(&self, other: &Parameter) -> Result<Parameter> {
        if self.key != other.key {
            return Err(Error::key_mismatch(self.key(), other.key()));
        }

        let conflicting = matches!(
            (&self.value, &other.value),
            (Some(a), Some(b)) if a != b
        );
        let has_enum = self
            .internals
            .iter()
            .chain(&other.internals)
            .any(Constraint::is_enum);

        let extra_members = if conflicting || has_enum {
            self.value.iter().chain(&other.value).cloned().collect()
        } else {
            Vec::new()
        };
        let value = if conflicting {
            None
        } else {
            self.value.clone().or_else(|| other.value.clone())
        };

        let mut externals = self.externals.clone();
        for external in &other.externals {
            if !externals.contains(external) {
                externals.push(external.clone());
            }
        }

        debug!(
            "Merging parameter {:?} ({} + {} constraints)",
            self.key,
            self.internals.len(),
            other.internals.len()
        );

        Ok(Parameter {
            key: self.key.clone(),
            name: self.name.clone().or_else(|| other.name.clone()),
            value,
            kind: self.kind.or(other.kind),
            format: self.format.clone().or_else(|| other.format.clone()),
            internals: merge::merge_constraints(&self.internals, &other.internals, extra_members),
            externals,
            required: self.required,
            description: self
                .description
                .clone()
                .or_else(|| other.description.clone()),
            example: self.example.clone().or_else(|| other.example.clone()),
        })
    }

    /// Recursive conversion to plain JSON for downstream emitters
    pub fn to_plain_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}
