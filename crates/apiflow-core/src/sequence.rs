//! Template strings decomposed into literal and variable segments.
//!
//! A `Sequence` represents text such as `/users/{userId}/orders` as an ordered
//! list of segments: literal text (a single-value enumeration) and named
//! placeholders. Placeholders are found by scanning for caller-supplied
//! delimiter pairs; without delimiters the whole string is one literal.
//!
//! # Examples
//!
//! ```
//! use apiflow_core::{Delimiter, Sequence};
//!
//! let path = Sequence::parse("/users/{userId}", &[Delimiter::braces()]);
//! assert_eq!(path.variables(), vec!["userId"]);
//! assert_eq!(path.generate(&[], true), "/users/userId");
//! assert_eq!(path.generate(&[Delimiter::double_braces()], true), "/users/{{userId}}");
//! ```

use std::cmp::Reverse;

use log::{trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::Delimiter;
use crate::parameter::{Parameter, ParameterType};
use crate::Result;

/// One part of a template string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "segment", content = "parameter", rename_all = "lowercase")]
pub enum Segment {
    /// Fixed text, held as a single-value `Enum` parameter
    Literal(Parameter),
    /// A placeholder keyed by its variable name; anonymous when unkeyed
    Variable(Parameter),
}

impl Segment {
    pub fn parameter(&self) -> &Parameter {
        match self {
            Self::Literal(param) | Self::Variable(param) => param,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    fn generate_with<R: Rng + ?Sized>(
        &self,
        delimiters: &[Delimiter],
        use_default: bool,
        rng: &mut R,
    ) -> String {
        match self {
            Self::Literal(param) => to_text(param.generate_with(use_default, rng)),
            Self::Variable(param) => {
                let name = param.key().unwrap_or_default();
                let placeholder = || match delimiters.first() {
                    Some(delimiter) => delimiter.wrap(name),
                    None => name.to_string(),
                };

                if use_default {
                    if !delimiters.is_empty() {
                        return placeholder();
                    }
                    return param.value().cloned().map(to_text).unwrap_or_else(placeholder);
                }

                let text = to_text(param.generate_with(false, rng));
                if text.is_empty() {
                    placeholder()
                } else {
                    text
                }
            }
        }
    }

    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Self::Literal(_), Self::Literal(_)) => true,
            (Self::Variable(a), Self::Variable(b)) => a.key() == b.key(),
            _ => false,
        }
    }
}

/// An ordered decomposition of a template string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence {
    segments: Vec<Segment>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::literal("")
    }
}

impl Sequence {
    /// A sequence holding `text` as a single literal segment
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Literal(Parameter::literal(text))],
        }
    }

    /// Build a sequence from raw segments; an empty list becomes one empty literal
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        if segments.is_empty() {
            return Self::default();
        }
        Self { segments }
    }

    /// Scan `source` left to right for any of `delimiters`.
    ///
    /// When several opening markers start at the same position the longest
    /// wins. An opening marker without a matching close leaves the rest of the
    /// string as literal text.
    pub fn parse(source: &str, delimiters: &[Delimiter]) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        loop {
            let next = delimiters
                .iter()
                .filter(|d| !d.open.is_empty() && !d.close.is_empty())
                .filter_map(|d| rest.find(&d.open).map(|start| (start, d)))
                .min_by_key(|(start, d)| (*start, Reverse(d.open.len())));

            let Some((start, delimiter)) = next else {
                literal.push_str(rest);
                break;
            };

            let inner = &rest[start + delimiter.open.len()..];
            let Some(end) = inner.find(&delimiter.close) else {
                trace!("Unterminated {} in {:?}; keeping it as text", delimiter, source);
                literal.push_str(rest);
                break;
            };

            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(Parameter::literal(std::mem::take(
                    &mut literal,
                ))));
            }
            segments.push(Segment::Variable(variable(&inner[..end])));
            rest = &inner[end + delimiter.close.len()..];
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(Parameter::literal(literal)));
        }
        Self::from_segments(segments)
    }

    /// Replace variable segments with externally declared parameters of the same key
    #[must_use]
    pub fn with_definitions(&self, definitions: &[Parameter]) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Variable(param) => {
                    let definition = definitions
                        .iter()
                        .find(|d| param.key().is_some() && d.key() == param.key());
                    match definition {
                        Some(definition) => Segment::Variable(definition.clone()),
                        None => segment.clone(),
                    }
                }
                literal => literal.clone(),
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the keyed variable segments, in order
    pub fn variables(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter(|s| s.is_variable())
            .filter_map(|s| s.parameter().key())
            .collect()
    }

    pub fn is_template(&self) -> bool {
        self.segments.iter().any(Segment::is_variable)
    }

    /// Generate using the thread-local random source
    pub fn generate(&self, delimiters: &[Delimiter], use_default: bool) -> String {
        self.generate_with(delimiters, use_default, &mut rand::thread_rng())
    }

    /// Concatenate one generated value per segment.
    ///
    /// Variables render as their name wrapped in the first of `delimiters`,
    /// or as the bare name when no delimiters are given. With `use_default`
    /// unset, variables carrying constraints generate from them instead.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        delimiters: &[Delimiter],
        use_default: bool,
        rng: &mut R,
    ) -> String {
        self.segments
            .iter()
            .map(|segment| segment.generate_with(delimiters, use_default, rng))
            .collect()
    }

    /// Template text: the first declared value of each literal and each
    /// variable wrapped in the first of `delimiters`
    pub fn source(&self, delimiters: &[Delimiter]) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(param) => param
                    .declared_values()
                    .into_iter()
                    .next()
                    .map(to_text)
                    .unwrap_or_default(),
                Segment::Variable(param) => {
                    let name = param.key().unwrap_or_default();
                    match delimiters.first() {
                        Some(delimiter) => delimiter.wrap(name),
                        None => name.to_string(),
                    }
                }
            })
            .collect()
    }

    /// Declared domain: the members of a lone literal segment, otherwise the
    /// template [`source`](Self::source)
    pub fn declared_values(&self, delimiters: &[Delimiter]) -> Vec<JsonValue> {
        match self.segments.as_slice() {
            [Segment::Literal(param)] => param.declared_values(),
            _ => vec![JsonValue::String(self.source(delimiters))],
        }
    }

    /// Merge two sequences segment by segment.
    ///
    /// Sequences with the same shape (same segment kinds and variable names)
    /// merge pairwise, so literal text becomes a choice between both sides.
    /// Sequences of different shapes cannot be combined and `self` is kept.
    pub fn merge(&self, other: &Sequence) -> Result<Sequence> {
        if self == other {
            return Ok(self.clone());
        }

        let aligned = self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b));
        if !aligned {
            warn!(
                "Cannot merge template sequences of different shapes ({} vs {} segments); keeping the first",
                self.segments.len(),
                other.segments.len()
            );
            return Ok(self.clone());
        }

        let segments = self
            .segments
            .iter()
            .zip(&other.segments)
            .map(|(a, b)| {
                let merged = a.parameter().merge(b.parameter())?;
                Ok(match a {
                    Segment::Literal(_) => Segment::Literal(merged),
                    Segment::Variable(_) => Segment::Variable(merged),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Recursive conversion to plain JSON for downstream emitters
    pub fn to_plain_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<&str> for Sequence {
    fn from(text: &str) -> Self {
        Self::literal(text)
    }
}

fn variable(name: &str) -> Parameter {
    let param = Parameter::new().with_type(ParameterType::String);
    if name.is_empty() {
        param
    } else {
        param.with_key(name).with_name(name)
    }
}

pub(crate) fn to_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constraint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn braces() -> Vec<Delimiter> {
        vec![Delimiter::braces()]
    }

    #[test]
    fn test_no_delimiters_is_one_literal() {
        for source in ["", "/users/{userId}", "plain text", "{{x}}"] {
            let sequence = Sequence::parse(source, &[]);
            assert_eq!(sequence.segments().len(), 1);
            assert!(!sequence.is_template());
            assert_eq!(sequence.generate(&[], true), source);
            assert_eq!(sequence.generate(&[], false), source);
        }
    }

    #[test]
    fn test_alternating_segments() {
        let sequence = Sequence::parse("{sub}.paw.{ext}", &braces());
        let kinds: Vec<bool> = sequence.segments().iter().map(Segment::is_variable).collect();
        assert_eq!(kinds, vec![true, false, true]);
        assert_eq!(sequence.variables(), vec!["sub", "ext"]);
        assert_eq!(sequence.generate(&[], true), "sub.paw.ext");
        assert_eq!(sequence.generate(&braces(), true), "{sub}.paw.{ext}");
    }

    #[test]
    fn test_multiple_delimiter_pairs() {
        let delimiters = vec![Delimiter::braces(), Delimiter::double_braces()];
        let sequence = Sequence::parse("/a/{{token}}/b/{id}", &delimiters);
        assert_eq!(sequence.variables(), vec!["token", "id"]);
        assert_eq!(
            sequence.generate(&[Delimiter::symmetric(":")], true),
            "/a/:token:/b/:id:"
        );
    }

    #[test]
    fn test_unterminated_delimiter_stays_literal() {
        let sequence = Sequence::parse("/users/{id}/items/{item", &braces());
        assert_eq!(sequence.variables(), vec!["id"]);
        assert_eq!(sequence.generate(&braces(), true), "/users/{id}/items/{item");
        assert_eq!(sequence.segments().len(), 3);
    }

    #[test]
    fn test_anonymous_variable() {
        let sequence = Sequence::parse("/files/{}", &braces());
        assert!(sequence.is_template());
        assert!(sequence.variables().is_empty());
        assert_eq!(sequence.generate(&braces(), true), "/files/{}");
        assert_eq!(sequence.generate(&[], true), "/files/");
    }

    #[test]
    fn test_definitions_drive_generation() {
        let status = Parameter::one_of("status", ["active"]);
        let sequence = Sequence::parse("/users/{status}", &braces()).with_definitions(&[status]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sequence.generate_with(&braces(), true, &mut rng), "/users/{status}");
        assert_eq!(sequence.generate_with(&[], false, &mut rng), "/users/active");
    }

    #[test]
    fn test_variable_value_used_without_delimiters() {
        let version = Parameter::keyed("version").with_value("v2");
        let sequence = Sequence::parse("/api/{version}", &braces()).with_definitions(&[version]);
        assert_eq!(sequence.generate(&[], true), "/api/v2");
        assert_eq!(sequence.generate(&braces(), true), "/api/{version}");
    }

    #[test]
    fn test_merge_literals_become_choices() -> crate::Result<()> {
        let a = Sequence::literal("8080");
        let b = Sequence::literal("443");
        let merged = a.merge(&b)?;
        assert_eq!(merged.declared_values(&[]), vec![json!("443"), json!("8080")]);
        Ok(())
    }

    #[test]
    fn test_merge_templates_of_same_shape() -> crate::Result<()> {
        let a = Sequence::parse("/v1/users/{id}", &braces());
        let b = Sequence::parse("/v2/users/{id}", &braces());
        let merged = a.merge(&b)?;
        assert_eq!(merged.variables(), vec!["id"]);
        let mut seen = std::collections::HashSet::new();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            seen.insert(merged.generate_with(&braces(), true, &mut rng));
        }
        assert!(seen.contains("/v1/users/{id}"));
        assert!(seen.contains("/v2/users/{id}"));
        assert_eq!(seen.len(), 2);
        Ok(())
    }

    #[test]
    fn test_merge_mismatched_shapes_keeps_self() -> crate::Result<()> {
        let a = Sequence::parse("/users/{id}", &braces());
        let b = Sequence::parse("/users/{id}/{sub}", &braces());
        assert_eq!(a.merge(&b)?, a);
        Ok(())
    }

    #[test]
    fn test_literal_segment_is_single_enum() {
        let sequence = Sequence::literal("/users");
        match &sequence.segments()[0] {
            Segment::Literal(param) => {
                assert_eq!(param.internals(), &[Constraint::enumeration(["/users"])]);
                assert_eq!(param.value(), None);
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_source_is_deterministic() -> crate::Result<()> {
        let a = Sequence::parse("/v1/{id}", &braces());
        let b = Sequence::parse("/v2/{id}", &braces());
        let merged = a.merge(&b)?;
        assert_eq!(merged.source(&[Delimiter::symmetric(":")]), "/v1/:id:");
        assert_eq!(
            merged.declared_values(&braces()),
            vec![json!("/v1/{id}")]
        );
        Ok(())
    }

    #[test]
    fn test_plain_value_shape() -> crate::Result<()> {
        let value = Sequence::parse("/u/{id}", &braces()).to_plain_value()?;
        assert_eq!(value[0]["segment"], json!("literal"));
        assert_eq!(value[1]["segment"], json!("variable"));
        assert_eq!(value[1]["parameter"]["key"], json!("id"));
        Ok(())
    }
}
