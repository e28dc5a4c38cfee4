//! Reference resolution over raw URL strings (RFC 3986, section 5.2).
//!
//! Works on the textual components directly so that hosts and ports holding
//! template placeholders resolve like any other text.

use once_cell::sync::Lazy;
use regex::Regex;

static REFERENCE_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("reference splitting pattern is valid")
});

static EMPTY_AUTHORITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*:)///").expect("empty authority pattern is valid")
});

#[derive(Debug, Default, PartialEq)]
struct Reference<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> Reference<'a> {
    fn split(text: &'a str) -> Self {
        match REFERENCE_PARTS.captures(text) {
            Some(caps) => {
                let group = |i: usize| caps.get(i).map(|m| m.as_str());
                Self {
                    scheme: group(1),
                    authority: group(2),
                    path: group(3).unwrap_or_default(),
                    query: group(4),
                    fragment: group(5),
                }
            }
            None => Self {
                path: text,
                ..Self::default()
            },
        }
    }
}

/// Resolve `reference` against the absolute or relative `base`
pub(crate) fn resolve_reference(base: &str, reference: &str) -> String {
    let base = Reference::split(base);
    let target = Reference::split(reference);

    let (scheme, authority, path, query) = if target.scheme.is_some() {
        (
            target.scheme,
            target.authority,
            remove_dot_segments(target.path),
            target.query,
        )
    } else if target.authority.is_some() {
        (
            base.scheme,
            target.authority,
            remove_dot_segments(target.path),
            target.query,
        )
    } else if target.path.is_empty() {
        (
            base.scheme,
            base.authority,
            base.path.to_string(),
            target.query.or(base.query),
        )
    } else if target.path.starts_with('/') {
        (
            base.scheme,
            base.authority,
            remove_dot_segments(target.path),
            target.query,
        )
    } else {
        let merged = merge_paths(&base, target.path);
        (
            base.scheme,
            base.authority,
            remove_dot_segments(&merged),
            target.query,
        )
    };

    let mut resolved = String::new();
    if let Some(scheme) = scheme {
        resolved.push_str(scheme);
        resolved.push(':');
    }
    if let Some(authority) = authority {
        resolved.push_str("//");
        resolved.push_str(authority);
    }
    resolved.push_str(&path);
    if let Some(query) = query {
        resolved.push('?');
        resolved.push_str(query);
    }
    if let Some(fragment) = target.fragment {
        resolved.push('#');
        resolved.push_str(fragment);
    }
    resolved
}

/// Collapse a `scheme:///` prefix into `scheme://`; any other text is untouched
pub(crate) fn collapse_empty_authority(resolved: &str) -> String {
    EMPTY_AUTHORITY.replace(resolved, "$1//").into_owned()
}

fn merge_paths(base: &Reference<'_>, relative: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{}", relative);
    }
    match base.path.rfind('/') {
        Some(index) => format!("{}{}", &base.path[..=index], relative),
        None => relative.to_string(),
    }
}

fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output: Vec<&str> = Vec::new();

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            output.pop();
        } else if input == "/.." {
            input = "/";
            output.pop();
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |index| index + start);
            output.push(&input[..end]);
            input = &input[end..];
        }
    }

    output.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc_examples() {
        let base = "http://a/b/c/d;p?q";
        let cases = [
            ("g", "http://a/b/c/g"),
            ("./g", "http://a/b/c/g"),
            ("g/", "http://a/b/c/g/"),
            ("/g", "http://a/g"),
            ("//g", "http://g"),
            ("?y", "http://a/b/c/d;p?y"),
            ("g?y", "http://a/b/c/g?y"),
            ("#s", "http://a/b/c/d;p?q#s"),
            ("", "http://a/b/c/d;p?q"),
            (".", "http://a/b/c/"),
            ("..", "http://a/b/"),
            ("../g", "http://a/b/g"),
            ("../../g", "http://a/g"),
            ("../../../g", "http://a/g"),
            ("/./g", "http://a/g"),
            ("g/../h", "http://a/b/c/h"),
            ("g;x=1/./y", "http://a/b/c/g;x=1/y"),
            ("https:g", "https:g"),
        ];
        for (reference, expected) in cases {
            assert_eq!(resolve_reference(base, reference), expected, "resolving {reference:?}");
        }
    }

    #[test]
    fn test_templates_survive_resolution() {
        assert_eq!(
            resolve_reference(
                "https://{sub}.paw.{ext}/users/{userId}/",
                "./purchases/{purchaseId}"
            ),
            "https://{sub}.paw.{ext}/users/{userId}/purchases/{purchaseId}"
        );
        assert_eq!(
            resolve_reference("http://{host}:{port}", "status"),
            "http://{host}:{port}/status"
        );
    }

    #[test]
    fn test_collapse_empty_authority() {
        assert_eq!(collapse_empty_authority("http:///example.com/b"), "http://example.com/b");
        assert_eq!(collapse_empty_authority("http://example.com/b"), "http://example.com/b");
        assert_eq!(collapse_empty_authority("/a///b"), "/a///b");
    }
}
