//! Generation settings shared by parameters, sequences and URLs.
//!
//! This module defines `GenerationOptions`, which bundles the knobs every
//! serializer ends up passing around (variable delimiters, whether explicit
//! values win over constraints, how to recognise TLS-capable protocols and an
//! optional seed for reproducible output), and `Delimiter`, an opening and
//! closing marker pair used to find placeholders inside template strings.
//!
//! Options are read from strings only; loading the text is up to the caller.
//!
//! # Examples
//!
//! ```
//! use apiflow_core::config::{Delimiter, GenerationOptions};
//!
//! let yaml = r#"
//! variable_delimiters:
//!   - ["{{", "}}"]
//!   - ":"
//! seed: 7
//! "#;
//! let options = GenerationOptions::from_yaml_str(yaml).unwrap();
//! assert_eq!(options.variable_delimiters[0], Delimiter::new("{{", "}}"));
//! assert_eq!(options.variable_delimiters[1], Delimiter::symmetric(":"));
//! assert!(options.use_default);
//! ```

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_value::Value as SerdeValue;

/// Protocols treated as TLS-capable when a URL is marked secure
pub const DEFAULT_SECURE_PROTOCOL_PATTERN: &str =
    "^(https|wss|ftps|sftp|smtps|imaps|pop3s|ldaps|ircs):?$";

/// An opening/closing marker pair surrounding a template variable, e.g. `{` and `}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delimiter {
    pub open: String,
    pub close: String,
}

impl Delimiter {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// A delimiter that uses the same marker on both sides, e.g. `:` or `%`.
    pub fn symmetric(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self {
            close: marker.clone(),
            open: marker,
        }
    }

    /// Curly braces, the placeholder style of OpenAPI paths.
    pub fn braces() -> Self {
        Self::new("{", "}")
    }

    /// Double curly braces, the placeholder style of Postman and RAML.
    pub fn double_braces() -> Self {
        Self::new("{{", "}}")
    }

    /// Wrap a variable name with this delimiter pair
    pub fn wrap(&self, name: &str) -> String {
        format!("{}{}{}", self.open, name, self.close)
    }

    fn is_usable(&self) -> bool {
        !self.open.is_empty() && !self.close.is_empty()
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...{}", self.open, self.close)
    }
}

impl Serialize for Delimiter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [&self.open, &self.close].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Delimiter {
    /// Accepts either a `[open, close]` pair or a single symmetric marker
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = SerdeValue::deserialize(deserializer)?;

        let delimiter = match value {
            SerdeValue::String(marker) => Delimiter::symmetric(marker),
            SerdeValue::Seq(items) => {
                let mut markers = Vec::with_capacity(items.len());
                for item in items {
                    if let SerdeValue::String(s) = item {
                        markers.push(s);
                    } else {
                        return Err(serde::de::Error::custom(
                            "Expected delimiter markers to be strings",
                        ));
                    }
                }
                match markers.as_slice() {
                    [marker] => Delimiter::symmetric(marker.clone()),
                    [open, close] => Delimiter::new(open.clone(), close.clone()),
                    _ => {
                        return Err(serde::de::Error::custom(
                            "Expected one or two delimiter markers",
                        ));
                    }
                }
            }
            _ => {
                return Err(serde::de::Error::custom(
                    "Expected string or array of strings",
                ));
            }
        };

        if !delimiter.is_usable() {
            return Err(serde::de::Error::custom("Delimiter markers cannot be empty"));
        }
        Ok(delimiter)
    }
}

/// Settings controlling how example values are produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Delimiters to wrap template variables with; empty renders bare names
    pub variable_delimiters: Vec<Delimiter>,

    /// Whether an explicit value wins over constraint-driven generation
    pub use_default: bool,

    /// Regular expression recognising TLS-capable protocols
    pub secure_protocol_pattern: String,

    /// Seed for reproducible generation; entropy is used when absent
    pub seed: Option<u64>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            variable_delimiters: Vec::new(),
            use_default: true,
            secure_protocol_pattern: DEFAULT_SECURE_PROTOCOL_PATTERN.to_string(),
            seed: None,
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_delimiters(mut self, delimiters: impl IntoIterator<Item = Delimiter>) -> Self {
        self.variable_delimiters = delimiters.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_use_default(mut self, use_default: bool) -> Self {
        self.use_default = use_default;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse options from YAML text
    pub fn from_yaml_str(content: &str) -> crate::Result<Self> {
        let options: Self = serde_yaml::from_str(content)?;
        options.check()?;
        Ok(options)
    }

    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let options: Self = toml::from_str(content)?;
        options.check()?;
        Ok(options)
    }

    /// Render options as YAML text
    pub fn to_yaml_string(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Random source honouring `seed`
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Compiled form of `secure_protocol_pattern`
    pub fn secure_protocol_regex(&self) -> crate::Result<regex::Regex> {
        regex::Regex::new(&self.secure_protocol_pattern).map_err(|e| {
            crate::Error::config(format!(
                "Invalid secure_protocol_pattern {:?}: {}",
                self.secure_protocol_pattern, e
            ))
        })
    }

    fn check(&self) -> crate::Result<()> {
        self.secure_protocol_regex()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_defaults() {
        let options = GenerationOptions::default();
        assert!(options.variable_delimiters.is_empty());
        assert!(options.use_default);
        assert_eq!(options.secure_protocol_pattern, DEFAULT_SECURE_PROTOCOL_PATTERN);
        assert_eq!(options.seed, None);
    }

    #[test]
    fn test_delimiter_display() {
        assert_eq!(Delimiter::double_braces().to_string(), "{{...}}");
        assert!(Delimiter::symmetric(":").to_string().is_ascii());
    }

    #[test]
    fn test_yaml_roundtrip() -> crate::Result<()> {
        let options = GenerationOptions::new()
            .with_delimiters([Delimiter::braces(), Delimiter::symmetric("%")])
            .with_use_default(false)
            .with_seed(42);
        let yaml = options.to_yaml_string()?;
        let loaded = GenerationOptions::from_yaml_str(&yaml)?;
        assert_eq!(loaded, options);
        Ok(())
    }

    #[test]
    fn test_toml_partial() -> crate::Result<()> {
        let options = GenerationOptions::from_toml_str(
            r#"
            variable_delimiters = [["{{", "}}"]]
            use_default = false
            "#,
        )?;
        assert_eq!(options.variable_delimiters, vec![Delimiter::double_braces()]);
        assert!(!options.use_default);
        assert_eq!(options.seed, None);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_delimiters() {
        assert!(GenerationOptions::from_yaml_str("variable_delimiters: [[\"{\", \"}\", \"!\"]]").is_err());
        assert!(GenerationOptions::from_yaml_str("variable_delimiters: [\"\"]").is_err());
        assert!(GenerationOptions::from_yaml_str("variable_delimiters: [3]").is_err());
    }

    #[test]
    fn test_rejects_bad_secure_pattern() {
        let err = GenerationOptions::from_yaml_str("secure_protocol_pattern: \"(\"").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let options = GenerationOptions::new().with_seed(9);
        let a: Vec<u32> = (0..4).map(|_| options.rng().gen()).collect();
        let mut first = options.rng();
        let mut second = options.rng();
        let b: Vec<u32> = (0..4).map(|_| first.gen()).collect();
        let c: Vec<u32> = (0..4).map(|_| second.gen()).collect();
        assert_eq!(b, c);
        // fresh rngs restart the stream
        assert!(a.iter().all(|v| *v == a[0]));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(Delimiter::double_braces().wrap("userId"), "{{userId}}");
        assert_eq!(Delimiter::symmetric(":").wrap("id"), ":id:");
    }
}
