//! The URL entity: a request URL whose parts are parameters and templates.
//!
//! Each descriptive part of a URL is modelled with the value primitives of
//! this crate. The protocol is an enumeration of schemes, the hostname, port
//! and pathname are [`Sequence`]s so placeholders survive, and credentials,
//! search and hash are [`Parameter`]s. A `Url` is never mutated: [`Url::set`],
//! [`Url::merge`] and [`Url::resolve`] all return new instances.
//!
//! # Examples
//!
//! ```
//! use apiflow_core::{Delimiter, Url};
//!
//! let braces = [Delimiter::braces()];
//! let url = Url::parse("https://{sub}.paw.{ext}/users/{userId}/", &braces).unwrap();
//! assert_eq!(url.href(), "https://sub.paw.ext/users/userId/");
//!
//! let purchases = url.resolve("./purchases/{purchaseId}", &braces, true).unwrap();
//! assert_eq!(
//!     purchases.generate(&braces, true),
//!     "https://{sub}.paw.{ext}/users/{userId}/purchases/{purchaseId}"
//! );
//! ```

mod parse;
mod resolve;

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::{Delimiter, GenerationOptions, DEFAULT_SECURE_PROTOCOL_PATTERN};
use crate::constraint::Constraint;
use crate::parameter::{union_preserving_order, Parameter, ParameterType};
use crate::sequence::{to_text, Segment, Sequence};
use crate::{Error, Result};

static DEFAULT_SECURE_PROTOCOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_SECURE_PROTOCOL_PATTERN).expect("default secure protocol pattern is valid")
});

/// Addressable parts of a [`Url`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlField {
    Protocol,
    Username,
    Password,
    /// `hostname[:port]`; setting it splits into both parts
    Host,
    Hostname,
    Port,
    Pathname,
    Search,
    Hash,
}

impl UrlField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Username => "username",
            Self::Password => "password",
            Self::Host => "host",
            Self::Hostname => "hostname",
            Self::Port => "port",
            Self::Pathname => "pathname",
            Self::Search => "search",
            Self::Hash => "hash",
        }
    }
}

impl fmt::Display for UrlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A value supplied for one URL part.
///
/// Text is scanned for placeholders with the URL's delimiters, choices become
/// an enumeration, and ready-made parameters or sequences are used unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Text(String),
    Choices(Vec<String>),
    Parameter(Parameter),
    Sequence(Sequence),
}

impl From<&str> for Component {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Component {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for Component {
    fn from(choices: Vec<String>) -> Self {
        Self::Choices(choices)
    }
}

impl<const N: usize> From<[&str; N]> for Component {
    fn from(choices: [&str; N]) -> Self {
        Self::Choices(choices.iter().map(|c| c.to_string()).collect())
    }
}

impl From<Parameter> for Component {
    fn from(param: Parameter) -> Self {
        Self::Parameter(param)
    }
}

impl From<Sequence> for Component {
    fn from(sequence: Sequence) -> Self {
        Self::Sequence(sequence)
    }
}

impl Component {
    fn into_sequence(self, delimiters: &[Delimiter]) -> Sequence {
        match self {
            Self::Text(text) => Sequence::parse(&text, delimiters),
            Self::Choices(choices) => Sequence::from_segments(vec![Segment::Literal(
                Parameter::new()
                    .with_type(ParameterType::String)
                    .with_constraint(Constraint::enumeration(choices)),
            )]),
            Self::Parameter(param) => Sequence::from_segments(vec![Segment::Literal(param)]),
            Self::Sequence(sequence) => sequence,
        }
    }

    fn into_parameter(self, field: UrlField, delimiters: &[Delimiter]) -> Parameter {
        match self {
            Self::Text(text) => Parameter::one_of(field.key(), [text]),
            Self::Choices(choices) => Parameter::one_of(field.key(), choices),
            Self::Parameter(param) => param,
            Self::Sequence(sequence) => Parameter::one_of(field.key(), [sequence.source(delimiters)]),
        }
    }

    fn into_protocol(self, delimiters: &[Delimiter]) -> Parameter {
        match self {
            Self::Text(text) => Parameter::one_of("protocol", [with_colon(&text)]),
            Self::Choices(choices) => {
                Parameter::one_of("protocol", choices.iter().map(|c| with_colon(c)))
            }
            other => other.into_parameter(UrlField::Protocol, delimiters),
        }
    }
}

/// Concrete components of one generated URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlObject {
    pub protocol: Option<String>,
    pub slashes: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<String>,
    pub pathname: Option<String>,
    pub search: Option<String>,
    pub hash: Option<String>,
    pub origin: String,
    pub href: String,
}

/// A URL whose parts are constrained, example-generating values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Url {
    #[serde(default = "empty_protocol")]
    protocol: Parameter,
    #[serde(default)]
    slashes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hostname: Option<Sequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<Sequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pathname: Option<Sequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search: Option<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<Parameter>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    variable_delimiters: Vec<Delimiter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Default for Url {
    fn default() -> Self {
        Self {
            protocol: empty_protocol(),
            slashes: false,
            username: None,
            password: None,
            hostname: None,
            port: None,
            pathname: None,
            search: None,
            hash: None,
            secure: false,
            variable_delimiters: Vec::new(),
            description: None,
        }
    }
}

/// Builder for a [`Url`] from individual parts.
///
/// Hostname, port and pathname text is scanned with the builder's variable
/// delimiters when the URL is built, so the order of calls does not matter.
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    protocol: Option<Component>,
    slashes: Option<bool>,
    username: Option<Component>,
    password: Option<Component>,
    hostname: Option<Component>,
    port: Option<Component>,
    pathname: Option<Component>,
    search: Option<Component>,
    hash: Option<Component>,
    secure: bool,
    variable_delimiters: Vec<Delimiter>,
    description: Option<String>,
}

impl UrlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: impl Into<Component>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn slashes(mut self, slashes: bool) -> Self {
        self.slashes = Some(slashes);
        self
    }

    pub fn username(mut self, username: impl Into<Component>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<Component>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set both hostname and port from `hostname[:port]`
    pub fn host(mut self, host: &str) -> Self {
        let (hostname, port) = parse::split_host(host);
        self.hostname = hostname.map(Component::Text);
        self.port = port.map(Component::Text);
        self
    }

    pub fn hostname(mut self, hostname: impl Into<Component>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn port(mut self, port: impl Into<Component>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn pathname(mut self, pathname: impl Into<Component>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }

    pub fn search(mut self, search: impl Into<Component>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<Component>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn variable_delimiters(mut self, delimiters: impl IntoIterator<Item = Delimiter>) -> Self {
        self.variable_delimiters = delimiters.into_iter().collect();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build the URL, rejecting a literal port that is not a number
    pub fn build(self) -> Result<Url> {
        let url = self.assemble();
        if let Some(port) = &url.port {
            check_port(port)?;
        }
        Ok(url)
    }

    fn assemble(self) -> Url {
        let delimiters = self.variable_delimiters;
        let hostname = self.hostname.map(|c| c.into_sequence(&delimiters));
        let slashes = self.slashes.unwrap_or(hostname.is_some());

        Url {
            protocol: self
                .protocol
                .map_or_else(empty_protocol, |c| c.into_protocol(&delimiters)),
            slashes,
            username: self
                .username
                .map(|c| c.into_parameter(UrlField::Username, &delimiters)),
            password: self
                .password
                .map(|c| c.into_parameter(UrlField::Password, &delimiters)),
            hostname,
            port: self.port.map(|c| c.into_sequence(&delimiters)),
            pathname: self.pathname.map(|c| c.into_sequence(&delimiters)),
            search: self
                .search
                .map(|c| c.into_parameter(UrlField::Search, &delimiters)),
            hash: self.hash.map(|c| c.into_parameter(UrlField::Hash, &delimiters)),
            secure: self.secure,
            variable_delimiters: delimiters,
            description: self.description,
        }
    }
}

impl Url {
    pub fn builder() -> UrlBuilder {
        UrlBuilder::new()
    }

    /// Parse a URL string, scanning hostname, port and pathname for
    /// placeholders wrapped in any of `delimiters`.
    ///
    /// Components are percent-decoded one by one. Credentials written as
    /// `user:pass@` land in the username and password parts.
    pub fn parse(source: &str, delimiters: &[Delimiter]) -> Result<Self> {
        let raw = parse::split(source, delimiters)?;
        debug!("Parsed URL {:?} into {:?}", source, raw);

        let mut builder = UrlBuilder::new()
            .slashes(raw.slashes)
            .variable_delimiters(delimiters.iter().cloned());
        if let Some(protocol) = raw.protocol {
            builder = builder.protocol(protocol);
        }
        if let Some(username) = raw.username {
            builder = builder.username(username);
        }
        if let Some(password) = raw.password {
            builder = builder.password(password);
        }
        if let Some(hostname) = raw.hostname {
            builder = builder.hostname(hostname);
        }
        if let Some(port) = raw.port {
            builder = builder.port(port);
        }
        if let Some(pathname) = raw.pathname {
            builder = builder.pathname(pathname);
        }
        if let Some(search) = raw.search {
            builder = builder.search(search);
        }
        if let Some(hash) = raw.hash {
            builder = builder.hash(hash);
        }
        builder.build()
    }

    pub fn protocol(&self) -> &Parameter {
        &self.protocol
    }

    /// Declared protocols, each ending in `:`
    pub fn protocols(&self) -> Vec<String> {
        self.protocol
            .declared_values()
            .into_iter()
            .map(to_text)
            .collect()
    }

    pub fn has_slashes(&self) -> bool {
        self.slashes
    }

    pub fn username(&self) -> Option<&Parameter> {
        self.username.as_ref()
    }

    pub fn password(&self) -> Option<&Parameter> {
        self.password.as_ref()
    }

    pub fn hostname(&self) -> Option<&Sequence> {
        self.hostname.as_ref()
    }

    pub fn port(&self) -> Option<&Sequence> {
        self.port.as_ref()
    }

    pub fn pathname(&self) -> Option<&Sequence> {
        self.pathname.as_ref()
    }

    pub fn search(&self) -> Option<&Parameter> {
        self.search.as_ref()
    }

    pub fn hash(&self) -> Option<&Parameter> {
        self.hash.as_ref()
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn variable_delimiters(&self) -> &[Delimiter] {
        &self.variable_delimiters
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `user[:password]` as written in the source
    pub fn auth(&self) -> Option<String> {
        let username = self.username.as_ref().and_then(first_declared)?;
        match self.password.as_ref().and_then(first_declared) {
            Some(password) => Some(format!("{}:{}", username, password)),
            None => Some(username),
        }
    }

    /// `hostname[:port]` as written in the source
    pub fn host(&self) -> Option<String> {
        let hostname = self.source_of(self.hostname.as_ref())?;
        match self.source_of(self.port.as_ref()) {
            Some(port) => Some(format!("{}:{}", hostname, port)),
            None => Some(hostname),
        }
    }

    /// Pathname followed by search, as written in the source
    pub fn path(&self) -> Option<String> {
        let pathname = self.source_of(self.pathname.as_ref());
        let search = self.search.as_ref().and_then(first_declared);
        match (pathname, search) {
            (None, None) => None,
            (pathname, search) => Some(format!(
                "{}{}",
                pathname.unwrap_or_default(),
                search.unwrap_or_default()
            )),
        }
    }

    /// Search without its leading `?`
    pub fn query(&self) -> Option<String> {
        self.search
            .as_ref()
            .and_then(first_declared)
            .map(|search| search.trim_start_matches('?').to_string())
    }

    /// A copy with `field` replaced by `value`
    pub fn set(&self, field: UrlField, value: impl Into<Component>) -> Result<Url> {
        let delimiters = &self.variable_delimiters;
        let value = value.into();
        let mut url = self.clone();

        match field {
            UrlField::Protocol => url.protocol = value.into_protocol(delimiters),
            UrlField::Username => url.username = Some(value.into_parameter(field, delimiters)),
            UrlField::Password => url.password = Some(value.into_parameter(field, delimiters)),
            UrlField::Host => match value {
                Component::Text(host) => {
                    let (hostname, port) = parse::split_host(&host);
                    url.hostname = hostname.map(|h| Sequence::parse(&h, delimiters));
                    url.port = port.map(|p| Sequence::parse(&p, delimiters));
                }
                other => {
                    url.hostname = Some(other.into_sequence(delimiters));
                    url.port = None;
                }
            },
            UrlField::Hostname => url.hostname = Some(value.into_sequence(delimiters)),
            UrlField::Port => url.port = Some(value.into_sequence(delimiters)),
            UrlField::Pathname => url.pathname = Some(value.into_sequence(delimiters)),
            UrlField::Search => url.search = Some(value.into_parameter(field, delimiters)),
            UrlField::Hash => url.hash = Some(value.into_parameter(field, delimiters)),
        }

        if let Some(port) = &url.port {
            check_port(port)?;
        }
        Ok(url)
    }

    /// A copy without `field`
    #[must_use]
    pub fn unset(&self, field: UrlField) -> Url {
        let mut url = self.clone();
        match field {
            UrlField::Protocol => url.protocol = empty_protocol(),
            UrlField::Username => url.username = None,
            UrlField::Password => url.password = None,
            UrlField::Host => {
                url.hostname = None;
                url.port = None;
            }
            UrlField::Hostname => url.hostname = None,
            UrlField::Port => url.port = None,
            UrlField::Pathname => url.pathname = None,
            UrlField::Search => url.search = None,
            UrlField::Hash => url.hash = None,
        }
        url
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the delimiters used for later `set` and `resolve` calls
    #[must_use]
    pub fn with_variable_delimiters(mut self, delimiters: impl IntoIterator<Item = Delimiter>) -> Self {
        self.variable_delimiters = delimiters.into_iter().collect();
        self
    }

    /// Protocol and host of one generated URL, with bare variable names
    pub fn origin(&self) -> String {
        self.render(&[], true, &DEFAULT_SECURE_PROTOCOL, &mut rand::thread_rng())
            .origin
    }

    /// One generated URL with bare variable names and explicit values preferred
    pub fn href(&self) -> String {
        self.generate(&[], true)
    }

    /// Generate a URL string, wrapping variables in the first of `delimiters`
    pub fn generate(&self, delimiters: &[Delimiter], use_default: bool) -> String {
        self.to_url_object(delimiters, use_default).href
    }

    /// Generate every component of a URL
    pub fn to_url_object(&self, delimiters: &[Delimiter], use_default: bool) -> UrlObject {
        self.render(
            delimiters,
            use_default,
            &DEFAULT_SECURE_PROTOCOL,
            &mut rand::thread_rng(),
        )
    }

    /// Generate every component of a URL as described by `options`, drawing
    /// from `rng`
    pub fn to_url_object_with<R: Rng + ?Sized>(
        &self,
        options: &GenerationOptions,
        rng: &mut R,
    ) -> Result<UrlObject> {
        let secure = options.secure_protocol_regex()?;
        Ok(self.render(
            &options.variable_delimiters,
            options.use_default,
            &secure,
            rng,
        ))
    }

    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        options: &GenerationOptions,
        rng: &mut R,
    ) -> Result<String> {
        Ok(self.to_url_object_with(options, rng)?.href)
    }

    pub fn origin_with<R: Rng + ?Sized>(
        &self,
        options: &GenerationOptions,
        rng: &mut R,
    ) -> Result<String> {
        Ok(self.to_url_object_with(options, rng)?.origin)
    }

    /// Generate a URL and check it with the standard URL parser.
    ///
    /// Fails when placeholders are still present in places a concrete URL
    /// cannot hold them.
    pub fn to_url(&self, options: &GenerationOptions) -> Result<::url::Url> {
        let href = self.generate_with(options, &mut options.rng())?;
        Ok(::url::Url::parse(&href)?)
    }

    /// Resolve `relative` against a URL generated from `self`.
    ///
    /// The generated base keeps placeholders wrapped in `delimiters`, and the
    /// result is parsed back with this URL's own delimiters, so templates
    /// survive the round trip.
    pub fn resolve(&self, relative: &str, delimiters: &[Delimiter], use_default: bool) -> Result<Url> {
        let base = self.generate(delimiters, use_default);
        let resolved = resolve::resolve_reference(&base, relative);
        let resolved = resolve::collapse_empty_authority(&resolved);
        debug!("Resolved {:?} against {:?} into {:?}", relative, base, resolved);
        Url::parse(&resolved, &self.variable_delimiters)
    }

    /// Combine two descriptions of the same endpoint.
    ///
    /// Protocols are unioned in first-seen order; every other part merges as
    /// its parameter or sequence does. Metadata comes from `self` first.
    pub fn merge(&self, other: &Url) -> Result<Url> {
        debug!("Merging URL {:?} with {:?}", self.host(), other.host());

        let protocols = union_preserving_order(
            self.protocol
                .declared_values()
                .into_iter()
                .chain(other.protocol.declared_values()),
        );
        let protocol = if protocols.is_empty() {
            self.protocol.clone()
        } else {
            self.protocol
                .clone()
                .without_value()
                .with_internals(vec![Constraint::Enum(protocols)])
        };

        let mut variable_delimiters = self.variable_delimiters.clone();
        for delimiter in &other.variable_delimiters {
            if !variable_delimiters.contains(delimiter) {
                variable_delimiters.push(delimiter.clone());
            }
        }

        Ok(Url {
            protocol,
            slashes: self.slashes || other.slashes,
            username: merge_parameters(&self.username, &other.username)?,
            password: merge_parameters(&self.password, &other.password)?,
            hostname: merge_sequences(&self.hostname, &other.hostname)?,
            port: merge_sequences(&self.port, &other.port)?,
            pathname: merge_sequences(&self.pathname, &other.pathname)?,
            search: merge_parameters(&self.search, &other.search)?,
            hash: merge_parameters(&self.hash, &other.hash)?,
            secure: self.secure,
            variable_delimiters,
            description: self.description.clone().or_else(|| other.description.clone()),
        })
    }

    /// Declared domain of one part rather than an example
    pub fn param_values(&self, field: UrlField) -> Vec<JsonValue> {
        let delimiters = &self.variable_delimiters;
        let parameter = |param: &Option<Parameter>| {
            param
                .as_ref()
                .map(Parameter::declared_values)
                .unwrap_or_default()
        };
        let sequence = |seq: &Option<Sequence>| {
            seq.as_ref()
                .map(|s| s.declared_values(delimiters))
                .unwrap_or_default()
        };

        match field {
            UrlField::Protocol => self.protocol.declared_values(),
            UrlField::Username => parameter(&self.username),
            UrlField::Password => parameter(&self.password),
            UrlField::Host => self.host().map(JsonValue::String).into_iter().collect(),
            UrlField::Hostname => sequence(&self.hostname),
            UrlField::Port => sequence(&self.port),
            UrlField::Pathname => sequence(&self.pathname),
            UrlField::Search => parameter(&self.search),
            UrlField::Hash => parameter(&self.hash),
        }
    }

    /// Recursive conversion to plain JSON for downstream emitters
    pub fn to_plain_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    fn render<R: Rng + ?Sized>(
        &self,
        delimiters: &[Delimiter],
        use_default: bool,
        secure: &Regex,
        rng: &mut R,
    ) -> UrlObject {
        let protocol = self.choose_protocol(use_default, secure, rng);

        let sequence = |seq: &Option<Sequence>, rng: &mut R| {
            seq.as_ref()
                .map(|s| s.generate_with(delimiters, use_default, rng))
                .filter(|text| !text.is_empty())
        };
        let hostname = sequence(&self.hostname, &mut *rng);
        let port = sequence(&self.port, &mut *rng);
        let pathname = sequence(&self.pathname, &mut *rng);

        let parameter = |param: &Option<Parameter>, rng: &mut R| {
            param
                .as_ref()
                .map(|p| to_text(p.generate_with(use_default, rng)))
                .filter(|text| !text.is_empty())
        };
        let username = parameter(&self.username, &mut *rng);
        let password = parameter(&self.password, &mut *rng);
        let search = parameter(&self.search, &mut *rng).map(|s| with_prefix('?', s));
        let hash = parameter(&self.hash, &mut *rng).map(|h| with_prefix('#', h));

        let host = hostname.as_ref().map(|hostname| match &port {
            Some(port) => format!("{}:{}", hostname, port),
            None => hostname.clone(),
        });
        let protocol = match protocol {
            None if host.is_some() => Some("http:".to_string()),
            protocol => protocol,
        };
        let slashes = self.slashes || host.is_some();

        let mut prefix = protocol.clone().unwrap_or_default();
        if slashes && (protocol.is_some() || host.is_some()) {
            prefix.push_str("//");
        }
        let host_text = host.clone().unwrap_or_default();
        let origin = format!("{}{}", prefix, host_text);

        let mut href = prefix;
        if let Some(username) = &username {
            href.push_str(username);
            if let Some(password) = &password {
                href.push(':');
                href.push_str(password);
            }
            href.push('@');
        }
        href.push_str(&host_text);
        for part in [&pathname, &search, &hash].into_iter().flatten() {
            href.push_str(part);
        }

        UrlObject {
            protocol,
            slashes,
            username,
            password,
            host,
            hostname,
            port,
            pathname,
            search,
            hash,
            origin,
            href,
        }
    }

    /// Pick a protocol, restricted to TLS-capable ones when the URL is secure.
    ///
    /// With `use_default`, an explicit protocol value wins unless the URL is
    /// secure and that value is not TLS-capable.
    fn choose_protocol<R: Rng + ?Sized>(
        &self,
        use_default: bool,
        secure: &Regex,
        rng: &mut R,
    ) -> Option<String> {
        if use_default {
            if let Some(value) = self.protocol.value().cloned().map(to_text) {
                if !value.is_empty() && (!self.secure || secure.is_match(&value)) {
                    return Some(with_colon(&value));
                }
            }
        }

        if self.secure {
            let declared = self.protocols();
            let candidates: Vec<&String> = declared.iter().filter(|p| secure.is_match(p)).collect();
            match candidates.choose(rng) {
                Some(protocol) => return Some(with_colon(protocol)),
                None => warn!(
                    "URL is marked secure but none of {:?} is TLS-capable; picking any protocol",
                    declared
                ),
            }
        }

        let protocol = to_text(self.protocol.generate_with(use_default, rng));
        if protocol.is_empty() {
            None
        } else {
            Some(with_colon(&protocol))
        }
    }

    fn source_of(&self, sequence: Option<&Sequence>) -> Option<String> {
        sequence
            .map(|s| s.source(&self.variable_delimiters))
            .filter(|text| !text.is_empty())
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        Url::parse(source, &[])
    }
}

impl From<&::url::Url> for Url {
    fn from(url: &::url::Url) -> Self {
        let mut builder = UrlBuilder::new()
            .protocol(format!("{}:", url.scheme()))
            .slashes(url.has_authority());
        if !url.username().is_empty() {
            builder = builder.username(parse::decode_component(url.username()));
        }
        if let Some(password) = url.password() {
            builder = builder.password(parse::decode_component(password));
        }
        if let Some(hostname) = url.host_str() {
            builder = builder.hostname(hostname);
        }
        if let Some(port) = url.port() {
            builder = builder.port(port.to_string());
        }
        if !url.path().is_empty() {
            builder = builder.pathname(parse::decode_component(url.path()));
        }
        if let Some(query) = url.query() {
            builder = builder.search(format!("?{}", parse::decode_component(query)));
        }
        if let Some(fragment) = url.fragment() {
            builder = builder.hash(format!("#{}", parse::decode_component(fragment)));
        }
        builder.assemble()
    }
}

fn empty_protocol() -> Parameter {
    Parameter::keyed("protocol").with_type(ParameterType::String)
}

fn with_colon(protocol: &str) -> String {
    if protocol.ends_with(':') {
        protocol.to_string()
    } else {
        format!("{}:", protocol)
    }
}

fn with_prefix(prefix: char, text: String) -> String {
    if text.starts_with(prefix) {
        text
    } else {
        format!("{}{}", prefix, text)
    }
}

fn first_declared(param: &Parameter) -> Option<String> {
    param
        .declared_values()
        .into_iter()
        .next()
        .map(to_text)
        .filter(|text| !text.is_empty())
}

fn check_port(port: &Sequence) -> Result<()> {
    if port.is_template() {
        return Ok(());
    }
    for value in port.declared_values(&[]) {
        let text = to_text(value);
        if !text.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_url(format!("port {:?} is not a number", text)));
        }
    }
    Ok(())
}

fn merge_parameters(left: &Option<Parameter>, right: &Option<Parameter>) -> Result<Option<Parameter>> {
    Ok(match (left, right) {
        (Some(left), Some(right)) => Some(left.merge(right)?),
        (left, right) => left.clone().or_else(|| right.clone()),
    })
}

fn merge_sequences(left: &Option<Sequence>, right: &Option<Sequence>) -> Result<Option<Sequence>> {
    Ok(match (left, right) {
        (Some(left), Some(right)) => Some(left.merge(right)?),
        (left, right) => left.clone().or_else(|| right.clone()),
    })
}
