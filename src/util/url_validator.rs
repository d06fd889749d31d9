use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while checking a feed URL.
///
/// Parsing and scheme errors make a URL unusable everywhere. The host
/// errors only apply when the fetcher enforces the private-host policy
/// (`allow_private_hosts = false`).
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Parses a feed URL and checks that it is a well-formed absolute http(s) URI.
///
/// This is the check the OPML extractor applies to every `xmlUrl`. It says
/// nothing about where the host lives; see [`ensure_public_host`] for that.
///
/// # Examples
///
/// ```
/// use feedsink::util::parse_feed_url;
///
/// let url = parse_feed_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(parse_feed_url("file:///etc/passwd").is_err());
/// assert!(parse_feed_url("not a url").is_err());
/// ```
pub fn parse_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Rejects URLs whose host is localhost or a private, link-local or
/// unspecified IP address.
///
/// Only literal addresses are inspected; hostnames are not resolved.
pub fn ensure_public_host(url: &Url) -> Result<(), UrlValidationError> {
    let Some(host) = url.host_str() else {
        return Err(UrlValidationError::MissingHost);
    };

    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::Localhost);
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public(url: &str) -> Result<(), UrlValidationError> {
        ensure_public_host(&parse_feed_url(url)?)
    }

    #[test]
    fn test_well_formed_feed_urls() {
        assert!(parse_feed_url("https://example.com/feed.xml").is_ok());
        assert!(parse_feed_url("http://news.example.org").is_ok());
        assert!(parse_feed_url("  http://example.com/padded.xml  ").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            parse_feed_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_feed_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_relative_and_garbage_rejected() {
        assert!(matches!(
            parse_feed_url("/feed.xml"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
        assert!(parse_feed_url("").is_err());
        assert!(parse_feed_url("example.com/feed").is_err());
    }

    #[test]
    fn test_localhost_is_not_public() {
        assert!(matches!(
            public("http://localhost/feed"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(matches!(
            public("http://127.0.0.1/feed"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(public("http://[::1]/feed").is_err());
    }

    #[test]
    fn test_private_ips_are_not_public() {
        assert!(public("http://192.168.1.1/feed").is_err());
        assert!(public("http://10.0.0.1:3000/feed").is_err());
        assert!(public("http://172.16.0.1/feed").is_err());
        assert!(public("http://169.254.1.1/feed").is_err());
        assert!(public("http://[fe80::1]/feed").is_err());
        assert!(public("http://0.0.0.0/feed").is_err());
    }

    #[test]
    fn test_public_hosts_accepted() {
        assert!(public("https://example.com/feed.xml").is_ok());
        assert!(public("https://example.com:443/feed.xml").is_ok());
        assert!(public("http://93.184.216.34/rss").is_ok());
    }
}
