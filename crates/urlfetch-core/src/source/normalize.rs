//! URL token normalization.

/// Scheme prepended to tokens that don't already carry an `http`/`https` one.
pub const DEFAULT_SCHEME: &str = "https://";

/// Normalizes a raw CSV token into an absolute URL.
///
/// Leading/trailing whitespace is trimmed. Anything that doesn't start with
/// `http` gets `https://` prepended; the check is a plain prefix test, so a
/// token like `httpbin.org` is passed through unchanged.
pub fn normalize_url(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("http") {
        token.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, token)
    }
}
