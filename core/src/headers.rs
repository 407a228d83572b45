//! Header value helpers: basic-auth credentials and `name=value` parameters.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";

/// `Basic <base64(user:pass)>` for the `Authorization` header.
pub fn basic_auth_header_value(user_and_pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(user_and_pass))
}

/// Look up a parameter such as `charset` in a header value like
/// `text/plain; charset=ISO-8859-1`.
///
/// Parameter names match case-insensitively; surrounding quotes on the value
/// are removed. Returns the value as written, which may be empty.
pub fn parse_header_parameter(header_value: &str, name: &str) -> Option<String> {
    header_value.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(value.to_string())
    })
}

/// `value` unless it is missing or empty, otherwise `fallback`.
pub fn first_non_empty<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}
