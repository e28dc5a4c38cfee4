//! Splitting URL strings into raw, percent-decoded components.
//!
//! The grammar is deliberately loose: template placeholders such as `{sub}`
//! or `{{port}}` must survive in every position, which rules out handing the
//! string to a strict URL parser.

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Delimiter;
use crate::{Error, Result};

static URL_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(?P<protocol>[A-Za-z][A-Za-z0-9+.\-]*:)?(?P<authority>//(?:(?P<username>[^:@/?#]*)(?::(?P<password>[^@/?#]*))?@)?(?P<host>[^/?#]*))?(?P<pathname>[^?#]*)(?P<search>\?[^#]*)?(?P<hash>#.*)?$",
    )
    .expect("URL splitting pattern is valid")
});

/// Raw components of a URL string, each `None` when absent or empty
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawUrl {
    pub protocol: Option<String>,
    pub slashes: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<String>,
    pub pathname: Option<String>,
    pub search: Option<String>,
    pub hash: Option<String>,
}

/// Split `source` into decoded components.
///
/// A scheme-less string without `//` has its leading pathname segment taken
/// as the host, so `echo.paw.cloud:8080/users` still names a host and port.
/// A first path segment that is a whole placeholder in one of `delimiters`
/// counts as a port too, as in `api.paw.cloud:{{port}}/users`.
pub(crate) fn split(source: &str, delimiters: &[Delimiter]) -> Result<RawUrl> {
    let source = source.trim();
    if source.is_empty() {
        return Err(Error::invalid_url("URL string is empty"));
    }

    let caps = URL_PARTS
        .captures(source)
        .ok_or_else(|| Error::invalid_url(format!("cannot split {:?}", source)))?;
    let field = |name: &str| caps.name(name).map(|m| m.as_str()).and_then(non_empty);

    let (hostname, port) = match field("host") {
        Some(host) => split_host(&host),
        None => (None, None),
    };

    let mut raw = RawUrl {
        protocol: field("protocol"),
        slashes: caps.name("authority").is_some(),
        username: field("username"),
        password: field("password"),
        hostname,
        port,
        pathname: field("pathname"),
        search: field("search"),
        hash: field("hash"),
    };

    if !raw.slashes && raw.hostname.is_none() {
        if let Some((hostname, port, pathname)) = port_after_scheme(&raw, delimiters) {
            trace!("Reading {:?} as host:port rather than a scheme", source);
            raw.protocol = None;
            raw.hostname = Some(hostname);
            raw.port = Some(port);
            raw.pathname = pathname;
            raw.slashes = true;
        }
    }

    if raw.protocol.is_none() && raw.hostname.is_none() && raw.port.is_none() {
        if let Some(pathname) = raw.pathname.take() {
            let (host, pathname) = split_pathname(&pathname);
            raw.pathname = pathname;
            if let Some(host) = host {
                trace!("Recovered host {:?} from the path of {:?}", host, source);
                let (hostname, port) = split_host(&host);
                raw.hostname = hostname;
                raw.port = port;
                raw.slashes = true;
            }
        }
    }

    Ok(decode(raw))
}

/// `localhost:8080/users` matches the scheme rule; a numeric or placeholder
/// first path segment shows the "scheme" is really a hostname and a port
fn port_after_scheme(
    raw: &RawUrl,
    delimiters: &[Delimiter],
) -> Option<(String, String, Option<String>)> {
    let hostname = raw.protocol.as_deref()?.strip_suffix(':')?;
    let pathname = raw.pathname.as_deref()?;
    let (port, rest) = match pathname.find('/') {
        Some(index) => pathname.split_at(index),
        None => (pathname, ""),
    };
    let numeric = !port.is_empty() && port.chars().all(|c| c.is_ascii_digit());
    if !numeric && !is_placeholder(port, delimiters) {
        return None;
    }
    Some((hostname.to_string(), port.to_string(), non_empty(rest)))
}

/// Whether `text` is exactly one variable wrapped in one of `delimiters`
fn is_placeholder(text: &str, delimiters: &[Delimiter]) -> bool {
    delimiters
        .iter()
        .filter(|d| !d.open.is_empty() && !d.close.is_empty())
        .any(|d| {
            text.len() >= d.open.len() + d.close.len()
                && text.starts_with(d.open.as_str())
                && text.ends_with(d.close.as_str())
        })
}

/// Split `host:port`, keeping bracketed IPv6 literals whole
pub(crate) fn split_host(host: &str) -> (Option<String>, Option<String>) {
    if host.starts_with('[') {
        if let Some(end) = host.find(']') {
            let (hostname, rest) = host.split_at(end + 1);
            let port = rest.strip_prefix(':').and_then(non_empty);
            return (non_empty(hostname), port);
        }
    }

    match host.split_once(':') {
        Some((hostname, port)) => (non_empty(hostname), non_empty(port)),
        None => (non_empty(host), None),
    }
}

/// Split a scheme-less pathname into a leading host and the remaining path.
///
/// Paths starting with `/` and dot-relative paths carry no host.
pub(crate) fn split_pathname(pathname: &str) -> (Option<String>, Option<String>) {
    if pathname.is_empty() {
        return (None, None);
    }
    if pathname.starts_with('/') || pathname.starts_with('.') {
        return (None, Some(pathname.to_string()));
    }

    match pathname.find('/') {
        Some(index) => {
            let (host, rest) = pathname.split_at(index);
            (non_empty(host), non_empty(rest))
        }
        None => (Some(pathname.to_string()), None),
    }
}

/// Percent-decode one component, keeping the raw text when it is not UTF-8
pub(crate) fn decode_component(text: &str) -> String {
    match urlencoding::decode(text) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            trace!("Keeping {:?} undecoded: {}", text, e);
            text.to_string()
        }
    }
}

fn decode(raw: RawUrl) -> RawUrl {
    let decode_field = |field: Option<String>| field.map(|text| decode_component(&text));

    RawUrl {
        protocol: decode_field(raw.protocol),
        slashes: raw.slashes,
        username: decode_field(raw.username),
        password: decode_field(raw.password),
        hostname: decode_field(raw.hostname),
        port: decode_field(raw.port),
        pathname: decode_field(raw.pathname),
        search: decode_field(raw.search),
        hash: decode_field(raw.hash),
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_split_full_template() -> crate::Result<()> {
        let raw = split("https://jon:paw@{sub}.paw.{ext}:{port}/users/{userId}?min={op}#home", &[])?;
        assert_eq!(
            raw,
            RawUrl {
                protocol: some("https:"),
                slashes: true,
                username: some("jon"),
                password: some("paw"),
                hostname: some("{sub}.paw.{ext}"),
                port: some("{port}"),
                pathname: some("/users/{userId}"),
                search: some("?min={op}"),
                hash: some("#home"),
            }
        );
        Ok(())
    }

    #[test]
    fn test_split_decodes_fields() -> crate::Result<()> {
        let raw = split("http://echo.paw.cloud/users/%7BuserId%7D?q=a%20b", &[])?;
        assert_eq!(raw.pathname, some("/users/{userId}"));
        assert_eq!(raw.search, some("?q=a b"));
        Ok(())
    }

    #[test]
    fn test_split_recovers_host_from_path() -> crate::Result<()> {
        let raw = split("{sub}.paw.{ext}:{port}/users/{userId}", &[])?;
        assert_eq!(raw.protocol, None);
        assert_eq!(raw.hostname, some("{sub}.paw.{ext}"));
        assert_eq!(raw.port, some("{port}"));
        assert_eq!(raw.pathname, some("/users/{userId}"));
        assert!(raw.slashes);
        Ok(())
    }

    #[test]
    fn test_split_host_and_port_without_scheme() -> crate::Result<()> {
        let raw = split("localhost:8080/users", &[])?;
        assert_eq!(raw.protocol, None);
        assert_eq!(raw.hostname, some("localhost"));
        assert_eq!(raw.port, some("8080"));
        assert_eq!(raw.pathname, some("/users"));

        let mail = split("mailto:jon@paw.cloud", &[])?;
        assert_eq!(mail.protocol, some("mailto:"));
        assert_eq!(mail.hostname, None);
        assert_eq!(mail.pathname, some("jon@paw.cloud"));
        Ok(())
    }

    #[test]
    fn test_split_path_only() -> crate::Result<()> {
        let raw = split("/some/path/{pathId}", &[])?;
        assert_eq!(raw.hostname, None);
        assert_eq!(raw.pathname, some("/some/path/{pathId}"));
        assert!(!raw.slashes);
        Ok(())
    }

    #[test]
    fn test_split_ipv6_host() -> crate::Result<()> {
        let raw = split("http://[::1]:8080/status", &[])?;
        assert_eq!(raw.hostname, some("[::1]"));
        assert_eq!(raw.port, some("8080"));
        Ok(())
    }

    #[test]
    fn test_split_ipv6_host_without_scheme() -> crate::Result<()> {
        let raw = split("[::1]:8080/status", &[])?;
        assert_eq!(raw.protocol, None);
        assert_eq!(raw.hostname, some("[::1]"));
        assert_eq!(raw.port, some("8080"));
        assert_eq!(raw.pathname, some("/status"));
        assert!(raw.slashes);
        Ok(())
    }

    #[test]
    fn test_split_templated_host_without_scheme() -> crate::Result<()> {
        let double_braces = [Delimiter::double_braces()];
        let raw = split("{{host}}:{{port}}/users", &double_braces)?;
        assert_eq!(raw.protocol, None);
        assert_eq!(raw.hostname, some("{{host}}"));
        assert_eq!(raw.port, some("{{port}}"));
        assert_eq!(raw.pathname, some("/users"));

        let raw = split("api.paw.cloud:{{port}}/users", &double_braces)?;
        assert_eq!(raw.protocol, None);
        assert_eq!(raw.hostname, some("api.paw.cloud"));
        assert_eq!(raw.port, some("{{port}}"));
        assert_eq!(raw.pathname, some("/users"));

        let raw = split("api.paw.cloud:{{port}}/users", &[])?;
        assert_eq!(raw.protocol, some("api.paw.cloud:"));
        Ok(())
    }

    #[test]
    fn test_split_rejects_blank() {
        assert!(matches!(split("   ", &[]), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_split_host() {
        assert_eq!(split_host(""), (None, None));
        assert_eq!(split_host(":"), (None, None));
        assert_eq!(split_host("echo.paw.cloud"), (some("echo.paw.cloud"), None));
        assert_eq!(
            split_host("echo.paw.cloud:8080"),
            (some("echo.paw.cloud"), some("8080"))
        );
    }

    #[test]
    fn test_split_pathname() {
        assert_eq!(split_pathname(""), (None, None));
        assert_eq!(split_pathname("{sub}.paw.{ext}"), (some("{sub}.paw.{ext}"), None));
        assert_eq!(
            split_pathname("/users/{userId}"),
            (None, some("/users/{userId}"))
        );
        assert_eq!(
            split_pathname("{sub}.paw.{ext}/users/{userId}/purchases/{purchaseId}"),
            (
                some("{sub}.paw.{ext}"),
                some("/users/{userId}/purchases/{purchaseId}")
            )
        );
    }
}
