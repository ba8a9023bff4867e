//! HTTP probing of candidate domains
//!
//! Issues a single GET against the configured probe path and returns the raw
//! status/headers/body for the scorer. Redirects are followed by an explicit
//! bounded loop rather than the client's built-in policy, so the cap is a hard
//! failure instead of a silent truncation. Bodies advertised as gzip/deflate
//! are decompressed before being handed on.

use anyhow::{bail, Context, Result};
use flate2::read::{GzDecoder, ZlibDecoder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, LOCATION};
use reqwest::Client;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;

/// Raw outcome of a single probe attempt, consumed immediately by the scorer
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Final HTTP status after redirects
    pub status: u16,
    /// Response headers with lowercased names
    pub headers: HashMap<String, String>,
    /// Decoded body text
    pub body: String,
    /// URL the response actually came from
    pub final_url: String,
}

/// HTTP client wrapper enforcing the probe semantics
pub struct Prober {
    client: Client,
    max_redirects: u32,
    probe_path: String,
}

impl Prober {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        // Probes are one-shot; keep-alive buys nothing here
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
            probe_path: config.probe_path.clone(),
        })
    }

    /// Build the probe URL for a scheme/domain pair.
    pub fn probe_url(&self, scheme: &str, domain: &str) -> String {
        format!("{}://{}{}", scheme, domain, self.probe_path)
    }

    /// Fetch a URL, following up to `max_redirects` 301/302 hops.
    ///
    /// Exceeding the redirect cap or any network-level failure (DNS, TLS,
    /// connect, timeout) is an error; non-2xx statuses are not.
    pub async fn fetch(&self, start_url: &str) -> Result<ProbeResult> {
        let mut url = Url::parse(start_url)
            .with_context(|| format!("Invalid probe URL: {}", start_url))?;
        let mut redirects = 0u32;

        loop {
            debug!("Probing {}", url);
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("Request to {} failed", url))?;

            let status = response.status().as_u16();
            if status == 301 || status == 302 {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    if redirects >= self.max_redirects {
                        bail!("Too many redirects (max {})", self.max_redirects);
                    }
                    let next = resolve_location(&url, location)?;
                    if redirects == 0 {
                        debug!(
                            "{} - following redirect: {} -> {}",
                            url.host_str().unwrap_or_default(),
                            url,
                            next
                        );
                    }
                    redirects += 1;
                    url = next;
                    continue;
                }
            }

            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_lowercase(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let final_url = url.to_string();
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body from {}", final_url))?;
            let body = decode_body(&bytes, headers.get("content-encoding").map(String::as_str))?;

            return Ok(ProbeResult {
                status,
                headers,
                body,
                final_url,
            });
        }
    }
}

/// Resolve a Location header value against the current URL.
///
/// Leading `/` means same-host absolute path; a value without a scheme is
/// appended to the host root; anything starting with `http` is absolute.
fn resolve_location(current: &Url, location: &str) -> Result<Url> {
    let target = if location.starts_with('/') {
        format!("{}://{}{}", current.scheme(), authority(current), location)
    } else if location.starts_with("http") {
        location.to_string()
    } else {
        format!("{}://{}/{}", current.scheme(), authority(current), location)
    };
    Url::parse(&target).with_context(|| format!("Invalid redirect location: {}", location))
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Decompress the body according to Content-Encoding, if any.
fn decode_body(bytes: &[u8], encoding: Option<&str>) -> Result<String> {
    let decoded = match encoding {
        Some(enc) if enc.eq_ignore_ascii_case("gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .context("Failed to decompress gzip body")?;
            out
        }
        Some(enc) if enc.eq_ignore_ascii_case("deflate") => {
            let mut out = Vec::new();
            ZlibDecoder::new(bytes)
                .read_to_end(&mut out)
                .context("Failed to decompress deflate body")?;
            out
        }
        _ => bytes.to_vec(),
    };
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_location_absolute_path() {
        let next = resolve_location(&url("https://example.com/umbraco/"), "/login").unwrap();
        assert_eq!(next.as_str(), "https://example.com/login");
    }

    #[test]
    fn test_resolve_location_preserves_port() {
        let next = resolve_location(&url("http://127.0.0.1:8080/umbraco/"), "/next").unwrap();
        assert_eq!(next.as_str(), "http://127.0.0.1:8080/next");
    }

    #[test]
    fn test_resolve_location_absolute_url() {
        let next =
            resolve_location(&url("https://example.com/umbraco/"), "http://other.com/a").unwrap();
        assert_eq!(next.as_str(), "http://other.com/a");
    }

    #[test]
    fn test_resolve_location_relative() {
        let next = resolve_location(&url("https://example.com/umbraco/"), "login.aspx").unwrap();
        assert_eq!(next.as_str(), "https://example.com/login.aspx");
    }

    #[test]
    fn test_decode_body_passthrough() {
        let body = decode_body(b"<html>hi</html>", None).unwrap();
        assert_eq!(body, "<html>hi</html>");
    }

    #[test]
    fn test_decode_body_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html>umbraco</html>").unwrap();
        let compressed = encoder.finish().unwrap();

        let body = decode_body(&compressed, Some("gzip")).unwrap();
        assert_eq!(body, "<html>umbraco</html>");
    }

    #[test]
    fn test_decode_body_deflate() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html>umbraco</html>").unwrap();
        let compressed = encoder.finish().unwrap();

        let body = decode_body(&compressed, Some("deflate")).unwrap();
        assert_eq!(body, "<html>umbraco</html>");
    }

    #[test]
    fn test_decode_body_bad_gzip_is_error() {
        assert!(decode_body(b"not gzip at all", Some("gzip")).is_err());
    }
}
