//! HTTP probes for DNS-over-HTTPS endpoints.
//!
//! A probe is a single request against `{scheme}://{host}/{suffix}` using
//! one of the two RFC 8484 encodings. It either elicits a DoH-shaped
//! response or it does not; transport errors are just another "no".

mod get;
mod post;

use std::fmt;
use std::net::Ipv6Addr;
use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::dns::DnsQuery;
use crate::error::Result;

/// Media type of wire-format DNS messages.
pub const DNS_MESSAGE: &str = "application/dns-message";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the query is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    /// Base64url query in the `dns` URL parameter.
    Get,
    /// Raw wire-format query as the request body.
    Post,
}

impl ProbeMethod {
    fn as_str(self) -> &'static str {
        match self {
            ProbeMethod::Get => "GET",
            ProbeMethod::Post => "POST",
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the HTTP side of probing.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Bound on each request, connect through response headers.
    pub timeout: Duration,
    /// URL scheme; `https` outside of tests.
    pub scheme: String,
    /// Skip certificate validation.
    pub insecure: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            scheme: "https".to_string(),
            insecure: false,
        }
    }
}

/// Issues probe requests over a shared HTTP client.
#[derive(Clone)]
pub struct Prober {
    client: Client,
    scheme: String,
}

impl Prober {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .redirect(Policy::none())
            .no_proxy()
            .danger_accept_invalid_certs(config.insecure)
            // Hosts are rarely revisited; don't hold sockets open for long.
            .pool_idle_timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
        })
    }

    /// URL of the candidate endpoint, or `None` if it doesn't form a valid URL.
    pub fn endpoint(&self, host: &str, suffix: &str) -> Option<Url> {
        let url = if host.parse::<Ipv6Addr>().is_ok() {
            format!("{}://[{}]/{}", self.scheme, host, suffix)
        } else {
            format!("{}://{}/{}", self.scheme, host, suffix)
        };

        Url::parse(&url).ok()
    }

    /// Send one request and report whether it looked like a DoH answer.
    pub async fn probe(
        &self,
        host: &str,
        suffix: &str,
        method: ProbeMethod,
        query: &DnsQuery,
    ) -> bool {
        let Some(url) = self.endpoint(host, suffix) else {
            debug!("[{}] {}/{} invalid endpoint URL", method, host, suffix);
            return false;
        };

        let start = Instant::now();
        let request = match method {
            ProbeMethod::Get => get::request(&self.client, url, query),
            ProbeMethod::Post => post::request(&self.client, url, query),
        };

        // Headers are all we judge; the body is dropped unread.
        match request.send().await {
            Ok(response) => {
                let matched = is_doh_response(response.status(), response.headers());
                debug!(
                    "[{}] {}/{} status={} matched={} elapsed={:.3}ms",
                    method,
                    host,
                    suffix,
                    response.status().as_u16(),
                    matched,
                    start.elapsed().as_secs_f64() * 1000.0
                );
                matched
            }
            Err(e) => {
                debug!(
                    "[{}] {}/{} failed after {:.3}ms: {}",
                    method,
                    host,
                    suffix,
                    start.elapsed().as_secs_f64() * 1000.0,
                    e
                );
                false
            }
        }
    }
}

/// Status exactly 200 and `Content-Type` exactly `application/dns-message`.
pub fn is_doh_response(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::OK
        && headers
            .get(CONTENT_TYPE)
            .is_some_and(|value| value.as_bytes() == DNS_MESSAGE.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn accepts_200_with_dns_message() {
        assert!(is_doh_response(StatusCode::OK, &headers(Some(DNS_MESSAGE))));
    }

    #[test]
    fn rejects_other_statuses() {
        for status in [
            StatusCode::NO_CONTENT,
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!is_doh_response(status, &headers(Some(DNS_MESSAGE))));
        }
    }

    #[test]
    fn rejects_missing_or_mismatched_content_type() {
        assert!(!is_doh_response(StatusCode::OK, &headers(None)));
        assert!(!is_doh_response(StatusCode::OK, &headers(Some("text/html"))));
        assert!(!is_doh_response(
            StatusCode::OK,
            &headers(Some("application/dns-json"))
        ));
        assert!(!is_doh_response(
            StatusCode::OK,
            &headers(Some("application/dns-message; charset=utf-8"))
        ));
    }

    #[test]
    fn endpoint_formats_host_and_suffix() {
        let prober = Prober::new(&ProbeConfig::default()).unwrap();

        assert_eq!(
            prober.endpoint("1.1.1.1", "dns-query").unwrap().as_str(),
            "https://1.1.1.1/dns-query"
        );
        assert_eq!(
            prober.endpoint("8.8.8.8", "").unwrap().as_str(),
            "https://8.8.8.8/"
        );
    }

    #[test]
    fn endpoint_keeps_suffix_verbatim() {
        let prober = Prober::new(&ProbeConfig::default()).unwrap();

        assert_eq!(
            prober.endpoint("9.9.9.9", "/dns-query").unwrap().as_str(),
            "https://9.9.9.9//dns-query"
        );
    }

    #[test]
    fn endpoint_brackets_ipv6_literals() {
        let prober = Prober::new(&ProbeConfig::default()).unwrap();

        assert_eq!(
            prober.endpoint("2606:4700::1111", "dns-query").unwrap().as_str(),
            "https://[2606:4700::1111]/dns-query"
        );
    }

    #[test]
    fn endpoint_rejects_unparseable_hosts() {
        let prober = Prober::new(&ProbeConfig::default()).unwrap();

        assert!(prober.endpoint("bad host", "dns-query").is_none());
    }
}
