//! Single-attempt page fetching with an SSRF guard.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument};
use url::{Host, Url};

use demoforge_shared::{DemoForgeError, Result, USER_AGENT};

/// Largest body accepted, in bytes.
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// A fetched HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub html: String,
}

/// Fetches one page. Implementations make exactly one attempt.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// `reqwest`-backed fetcher that refuses private and loopback targets, on the
/// first request and on every redirect hop.
pub struct HttpFetcher {
    client: Client,
    /// `host:port` exempt from the guard (a local mock server in tests).
    trusted_origin: Option<String>,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::build(timeout, None)
    }

    /// A fetcher that may reach `origin` (`host:port`) even though it is local.
    #[cfg(test)]
    pub(crate) fn trusting(timeout: Duration, origin: &str) -> Result<Self> {
        Self::build(timeout, Some(origin.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    fn build(timeout: Duration, trusted_origin: Option<String>) -> Result<Self> {
        let policy_origin = trusted_origin.clone();
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error(format!("more than {MAX_REDIRECTS} redirects"));
            }
            if is_blocked(attempt.url(), policy_origin.as_deref()) {
                let target = attempt.url().to_string();
                return attempt.error(format!("redirect to private or non-HTTP target: {target}"));
            }
            attempt.follow()
        });

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(policy)
            .timeout(timeout)
            .build()
            .map_err(|e| DemoForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            trusted_origin,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url)
            .map_err(|e| DemoForgeError::validation(format!("invalid URL '{url}': {e}")))?;

        if is_blocked(&parsed, self.trusted_origin.as_deref()) {
            return Err(DemoForgeError::validation(format!(
                "refusing to fetch private or non-HTTP target: {url}"
            )));
        }

        let mut response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| DemoForgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DemoForgeError::Network(format!("{url}: HTTP {status}")));
        }

        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(DemoForgeError::Network(format!(
                "{url}: body larger than {limit} bytes"
            )));
        }

        let final_url = response.url().to_string();
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DemoForgeError::Network(format!("{url}: body read failed: {e}")))?
        {
            if body.len() + chunk.len() > limit {
                return Err(DemoForgeError::Network(format!(
                    "{url}: body larger than {limit} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();

        debug!(bytes = body.len(), %final_url, "page fetched");
        Ok(FetchedPage { final_url, html })
    }
}

// ---------------------------------------------------------------------------
// SSRF guard
// ---------------------------------------------------------------------------

/// Is `url` refused, given an optional trusted `host:port`?
fn is_blocked(url: &Url, trusted_origin: Option<&str>) -> bool {
    if let (Some(trusted), Some(host), Some(port)) =
        (trusted_origin, url.host_str(), url.port_or_known_default())
    {
        if format!("{host}:{port}") == trusted && matches!(url.scheme(), "http" | "https") {
            return false;
        }
    }
    is_ssrf_target(url)
}

/// Would fetching `url` reach a local or non-HTTP resource?
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return true;
    }

    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(host)) => {
            let host = host.to_ascii_lowercase();
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (carrier-grade NAT)
                || (a == 100 && (b & 0xC0) == 64)
                || (a == 192 && b == 0 && c == 0)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ssrf(url: &str) -> bool {
        is_ssrf_target(&Url::parse(url).unwrap())
    }

    #[test]
    fn blocks_non_http_and_local_targets() {
        assert!(ssrf("file:///etc/passwd"));
        assert!(ssrf("http://192.168.1.1/admin"));
        assert!(ssrf("http://10.0.0.1/"));
        assert!(ssrf("http://127.0.0.1:8080/"));
        assert!(ssrf("http://[::1]/"));
        assert!(ssrf("http://[fd00::1]/"));
        assert!(ssrf("http://localhost:3000/api"));
        assert!(ssrf("http://printer.local/"));
    }

    #[test]
    fn allows_public_targets() {
        assert!(!ssrf("https://glowclinic.com/about"));
        assert!(!ssrf("http://93.184.216.34/"));
    }

    #[tokio::test]
    async fn refuses_localhost_by_default() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, DemoForgeError::Validation { .. }));
    }

    /// `host:port` of a mock server, for [`HttpFetcher::trusting`].
    fn origin(server: &MockServer) -> String {
        server.address().to_string()
    }

    #[tokio::test]
    async fn fetches_html_from_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><title>Glow</title></html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::trusting(Duration::from_secs(5), &origin(&server)).unwrap();
        let page = fetcher.fetch(&format!("{}/", server.uri())).await.unwrap();
        assert!(page.html.contains("<title>Glow</title>"));
        assert!(page.final_url.starts_with("http://"));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::trusting(Duration::from_secs(5), &origin(&server)).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn oversized_declared_body_is_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2_048)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::trusting(Duration::from_secs(5), &origin(&server))
            .unwrap()
            .with_max_body(1_024);
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(err.to_string().contains("body larger than 1024 bytes"), "{err}");
    }

    #[tokio::test]
    async fn oversized_chunked_body_is_refused() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        // A server that streams chunks without a Content-Length.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ntransfer-encoding: chunked\r\n\r\n")
                .await;
            let chunk = "y".repeat(512);
            for _ in 0..8 {
                let frame = format!("{:x}\r\n{chunk}\r\n", chunk.len());
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        let fetcher = HttpFetcher::trusting(Duration::from_secs(5), &addr.to_string())
            .unwrap()
            .with_max_body(1_024);
        let err = fetcher.fetch(&format!("http://{addr}/")).await.unwrap_err();
        assert!(err.to_string().contains("body larger than 1024 bytes"), "{err}");
    }

    #[tokio::test]
    async fn redirect_to_untrusted_local_target_is_refused() {
        // The redirect target answers fine; only the guard stops the hop.
        let internal = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .mount(&internal)
            .await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/admin", internal.uri())),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::trusting(Duration::from_secs(5), &origin(&server)).unwrap();
        let err = fetcher.fetch(&format!("{}/", server.uri())).await.unwrap_err();
        assert!(matches!(err, DemoForgeError::Network(_)), "{err}");
        assert!(internal.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn redirect_within_trusted_origin_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>moved</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::trusting(Duration::from_secs(5), &origin(&server)).unwrap();
        let page = fetcher.fetch(&format!("{}/old", server.uri())).await.unwrap();
        assert!(page.final_url.ends_with("/new"));
        assert_eq!(page.html, "<p>moved</p>");
    }
}
