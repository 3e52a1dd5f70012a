use url::{Host, Url};
use validator::ValidationError;

const MAX_CUSTOM_SHORT_LEN: usize = 32;

/// First path segments owned by fixed routes; a link under one of them could never be resolved
const RESERVED_SHORT_CODES: [&str; 2] = ["health", "api"];

/// Validates a caller-chosen short code:
/// - Empty means "not provided" and is accepted
/// - At most 32 characters
/// - Only ASCII letters, digits, hyphens and underscores, so it stays a single path segment
/// - Not one of the reserved route names (`health`, `api`)
pub fn validate_custom_short(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Ok(());
    }

    if code.len() > MAX_CUSTOM_SHORT_LEN {
        let mut err = ValidationError::new("custom_short_length");
        err.message = Some("Custom short must be at most 32 characters".into());
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("custom_short_charset");
        err.message = Some(
            "Custom short can only contain alphanumeric characters, hyphens, and underscores"
                .into(),
        );
        return Err(err);
    }

    if RESERVED_SHORT_CODES
        .iter()
        .any(|reserved| code.eq_ignore_ascii_case(reserved))
    {
        let mut err = ValidationError::new("custom_short_reserved");
        err.message = Some(format!("Custom short '{}' is reserved", code).into());
        return Err(err);
    }

    Ok(())
}

/// Parses a target URL the way users type them: a missing scheme is allowed
/// (`example.com/page`), anything other than http/https is not.
///
/// Returns `None` if the input is not a well-formed web URL.
pub fn parse_target_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }

    let url = if has_scheme(raw) {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("http://{}", raw)).ok()?
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    match url.host()? {
        Host::Ipv4(_) | Host::Ipv6(_) => Some(url),
        Host::Domain(domain) if is_plausible_domain(domain) => Some(url),
        Host::Domain(_) => None,
    }
}

// `scheme://` where scheme is ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };

    scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

// "localhost" or dotted labels ending in a TLD of two or more characters
fn is_plausible_domain(domain: &str) -> bool {
    if domain == "localhost" {
        return true;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| !label.is_empty())
        && labels.last().is_some_and(|tld| tld.len() >= 2)
}

/// Rewrites scheme-less and `http://` URLs to `https://`; HTTPS URLs pass through unchanged
pub fn enforce_https(raw: &str) -> String {
    let raw = raw.trim();

    if has_prefix_ignore_case(raw, "https://") {
        return raw.to_string();
    }

    let rest = if has_prefix_ignore_case(raw, "http://") {
        &raw["http://".len()..]
    } else {
        raw
    };

    format!("https://{}", rest)
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// True when `target` points back at the shortener itself.
///
/// Hosts are compared without a leading `www.` and without ports, so
/// `http://www.sho.rt:8080/x` is self-referential for a domain of `sho.rt`.
pub fn is_self_referential(target: &Url, domain: &str) -> bool {
    let Some(target_host) = target.host_str() else {
        return false;
    };

    strip_www(target_host).eq_ignore_ascii_case(strip_www(&domain_host(domain)))
}

fn domain_host(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    let candidate = if has_scheme(domain) {
        domain.to_string()
    } else {
        format!("http://{}", domain)
    };

    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| domain.to_lowercase())
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_custom_short() {
        // Valid codes
        assert!(validate_custom_short("my-link").is_ok());
        assert!(validate_custom_short("promo_2024").is_ok());
        assert!(validate_custom_short("").is_ok());

        // Invalid codes
        let too_long = "a".repeat(33);
        assert!(validate_custom_short(&too_long).is_err());
        assert!(validate_custom_short("nested/path").is_err());
        assert!(validate_custom_short("caf\u{e9}").is_err());
    }

    #[test]
    fn test_route_names_are_reserved() {
        assert!(validate_custom_short("health").is_err());
        assert!(validate_custom_short("Health").is_err());
        assert!(validate_custom_short("api").is_err());

        // Only exact matches are reserved
        assert!(validate_custom_short("healthy").is_ok());
        assert!(validate_custom_short("api-docs").is_ok());
    }

    #[test]
    fn test_parse_target_url() {
        // Valid URLs
        assert!(parse_target_url("https://example.com").is_some());
        assert!(parse_target_url("http://example.com/path?query=value").is_some());
        assert!(parse_target_url("example.com/page").is_some());
        assert!(parse_target_url("localhost:3000/docs").is_some());
        assert!(parse_target_url("http://127.0.0.1:8080").is_some());
        assert!(parse_target_url("example.com/?next=https://other.org").is_some());

        // Invalid URLs
        assert!(parse_target_url("").is_none());
        assert!(parse_target_url("not-a-url").is_none());
        assert!(parse_target_url("ftp://example.com").is_none());
        assert!(parse_target_url("https://exa mple.com").is_none());
        assert!(parse_target_url("http://").is_none());
    }

    #[test]
    fn test_enforce_https() {
        assert_eq!(
            enforce_https("example.com/page"),
            "https://example.com/page"
        );
        assert_eq!(
            enforce_https("http://example.com/page"),
            "https://example.com/page"
        );
        assert_eq!(
            enforce_https("HTTP://example.com/page"),
            "https://example.com/page"
        );
        assert_eq!(
            enforce_https("https://example.com/page?q=1"),
            "https://example.com/page?q=1"
        );
    }

    #[test]
    fn test_is_self_referential() {
        let own = parse_target_url("https://sho.rt/abc").unwrap();
        let own_www = parse_target_url("www.sho.rt:8080/abc").unwrap();
        let other = parse_target_url("https://example.com").unwrap();
        let local = parse_target_url("http://localhost:8000/x").unwrap();

        assert!(is_self_referential(&own, "sho.rt"));
        assert!(is_self_referential(&own_www, "https://sho.rt/"));
        assert!(!is_self_referential(&other, "sho.rt"));
        assert!(is_self_referential(&local, "localhost:8000"));
    }
}
