//! Website URL canonicalization.

/// Default ports that are dropped from canonical URLs.
const DEFAULT_PORTS: &[(&str, u16)] =
    &[("http", 80), ("https", 443), ("ftp", 21), ("ws", 80), ("wss", 443)];

/// Trim, lower-case scheme and host, and strip default ports.
///
/// Path, query, fragment and user-info are left byte-for-byte intact.
/// Strings that are not `scheme://...` URLs pass through trimmed.
pub fn normalize_url(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    Some(canonicalize(text).unwrap_or_else(|| text.to_string()))
}

fn canonicalize(text: &str) -> Option<String> {
    let (scheme, rest) = text.split_once("://")?;
    if !is_scheme(scheme) {
        return None;
    }
    let scheme = scheme.to_ascii_lowercase();

    let authority_end = rest.find(|c: char| matches!(c, '/' | '?' | '#')).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let (userinfo, host_port) = match authority.rfind('@') {
        Some(at) => authority.split_at(at + 1),
        None => ("", authority),
    };
    let (host, port) = split_host_port(host_port);

    let default_port = DEFAULT_PORTS.iter().find(|(s, _)| *s == scheme).map(|(_, port)| *port);
    let port = port.filter(|p| {
        !p.is_empty() && (default_port.is_none() || p.parse::<u16>().ok() != default_port)
    });

    let mut out = format!("{scheme}://{userinfo}{}", host.to_lowercase());
    if let Some(port) = port {
        out.push(':');
        out.push_str(port);
    }
    out.push_str(tail);
    Some(out)
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Split `host[:port]`, honouring bracketed IPv6 literals.
fn split_host_port(host_port: &str) -> (&str, Option<&str>) {
    if host_port.starts_with('[') {
        if let Some(close) = host_port.find(']') {
            let (host, after) = host_port.split_at(close + 1);
            return (host, after.strip_prefix(':'));
        }
        return (host_port, None);
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => (host, Some(port)),
        _ => (host_port, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize_url(raw).unwrap_or_default()
    }

    #[test]
    fn lowercases_scheme_and_host_only() {
        assert_eq!(norm("  HTTPS://Example.COM/Path?Q=Case  "), "https://example.com/Path?Q=Case");
    }

    #[test]
    fn strips_default_ports() {
        assert_eq!(norm("http://example.com:80/a"), "http://example.com/a");
        assert_eq!(norm("https://example.com:443"), "https://example.com");
        assert_eq!(norm("https://example.com:/x"), "https://example.com/x");
        assert_eq!(norm("https://example.com:8443/x"), "https://example.com:8443/x");
        assert_eq!(norm("http://[::1]:80/"), "http://[::1]/");
    }

    #[test]
    fn keeps_userinfo_verbatim() {
        assert_eq!(norm("FTP://User:Pw@Host.Example:21/"), "ftp://User:Pw@host.example/");
    }

    #[test]
    fn non_urls_pass_through() {
        assert_eq!(norm("www.Example.com"), "www.Example.com");
        assert_eq!(norm("see vendor site"), "see vendor site");
        assert_eq!(normalize_url("   "), None);
    }
}
