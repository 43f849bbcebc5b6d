//! Image URL admission.
//!
//! A URL is usable when, in order:
//! 1. it parses after upgrading `http://` to `https://`
//! 2. its host is not a deny-listed domain or a subdomain of one
//! 3. its path ends in an allowed extension
//! 4. a HEAD probe (unless disabled or the host is on the skip list) answers
//!    < 400 with an `image/*` content type and, when a length is declared,
//!    a size within bounds
//!
//! `fetch` applies 1-3 and then downloads the body with the same size bounds.

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::ImageConfig;
use crate::http::HttpTransport;

/// Why a URL or payload was not admitted. A normal negative outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    InvalidUrl(String),
    DeniedDomain(String),
    Extension,
    Status(u16),
    ContentType(String),
    Size(u64),
    NotImage,
    Transport(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "empty url"),
            Rejection::InvalidUrl(e) => write!(f, "invalid url: {e}"),
            Rejection::DeniedDomain(host) => write!(f, "denied domain {host}"),
            Rejection::Extension => write!(f, "missing or disallowed extension"),
            Rejection::Status(status) => write!(f, "status {status}"),
            Rejection::ContentType(ct) => write!(f, "content-type {ct:?}"),
            Rejection::Size(n) => write!(f, "size {n} out of bounds"),
            Rejection::NotImage => write!(f, "payload is not an image"),
            Rejection::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

/// Rewrites a leading `http://`, in any case, to `https://`, trimming whitespace.
pub fn to_https(url: &str) -> String {
    let url = url.trim();
    match url.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http://") => {
            format!("https://{}", &url[7..])
        }
        _ => url.to_string(),
    }
}

pub struct ImageValidator {
    config: ImageConfig,
    http: Arc<dyn HttpTransport>,
}

impl ImageValidator {
    pub fn new(config: ImageConfig, http: Arc<dyn HttpTransport>) -> Self {
        Self { config, http }
    }

    /// Returns the admitted (https) URL, or an empty string.
    pub fn validate(&self, raw: &str) -> String {
        match self.check(raw) {
            Ok(url) => url,
            Err(rejection) => {
                if rejection != Rejection::Empty {
                    log::debug!("image rejected url={raw} reason={rejection}");
                }
                String::new()
            }
        }
    }

    pub fn check(&self, raw: &str) -> Result<String, Rejection> {
        let (upgraded, url) = self.check_static(raw)?;
        self.check_head(&url)?;
        Ok(upgraded)
    }

    /// Downloads an admitted image, aborting once the body exceeds `max_bytes`.
    pub fn fetch(&self, raw: &str) -> Result<Vec<u8>, Rejection> {
        let (_, url) = self.check_static(raw)?;

        let resp = self
            .http
            .get(
                url.as_str(),
                &[],
                Duration::from_secs(self.config.fetch_timeout_secs),
            )
            .map_err(|e| Rejection::Transport(e.to_string()))?;

        if resp.is_error() {
            return Err(Rejection::Status(resp.status));
        }

        let mut bytes = Vec::new();
        resp.body
            .take(self.config.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| Rejection::Transport(e.to_string()))?;

        let len = bytes.len() as u64;
        if len > self.config.max_bytes || len < self.config.min_bytes {
            return Err(Rejection::Size(len));
        }

        // servers sometimes answer 200 with an HTML error page
        if !infer::is_image(&bytes) {
            return Err(Rejection::NotImage);
        }

        Ok(bytes)
    }

    /// Checks that need no network: scheme upgrade, domain and extension.
    fn check_static(&self, raw: &str) -> Result<(String, Url), Rejection> {
        let upgraded = to_https(raw);
        if upgraded.is_empty() {
            return Err(Rejection::Empty);
        }

        let url = Url::parse(&upgraded).map_err(|e| Rejection::InvalidUrl(e.to_string()))?;
        let host = url.host_str().unwrap_or_default().to_lowercase();

        if self.is_denied(&host) {
            return Err(Rejection::DeniedDomain(host));
        }

        if !self.has_allowed_extension(&url) {
            return Err(Rejection::Extension);
        }

        Ok((upgraded, url))
    }

    fn is_denied(&self, host: &str) -> bool {
        self.config.deny_domains.iter().any(|d| {
            let d = d.to_lowercase();
            host == d || host.ends_with(&format!(".{d}"))
        })
    }

    fn has_allowed_extension(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        let last = path.rsplit('/').next().unwrap_or_default();

        match last.rsplit_once('.') {
            Some((_, ext)) => self
                .config
                .allowed_exts
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    fn check_head(&self, url: &Url) -> Result<(), Rejection> {
        if !self.config.require_head_ok {
            return Ok(());
        }

        let host = url.host_str().unwrap_or_default().to_lowercase();
        if self
            .config
            .head_skip_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&host))
        {
            return Ok(());
        }

        let resp = self
            .http
            .head(url.as_str(), Duration::from_secs(self.config.head_timeout_secs))
            .map_err(|e| Rejection::Transport(e.to_string()))?;

        if resp.is_error() {
            return Err(Rejection::Status(resp.status));
        }

        let content_type = resp.content_type.clone().unwrap_or_default().to_lowercase();
        if !content_type.starts_with("image/") {
            return Err(Rejection::ContentType(content_type));
        }

        if let Some(len) = resp.content_length {
            if len < self.config.min_bytes || len > self.config.max_bytes {
                return Err(Rejection::Size(len));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::FakeHttp;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn config() -> ImageConfig {
        ImageConfig {
            min_bytes: 1024,
            max_bytes: 4096,
            ..Default::default()
        }
    }

    fn validator(http: &Arc<FakeHttp>) -> ImageValidator {
        ImageValidator::new(config(), http.clone())
    }

    #[test]
    fn test_to_https() {
        assert_eq!(to_https(" http://a.kr/x.jpg "), "https://a.kr/x.jpg");
        assert_eq!(to_https("https://a.kr/x.jpg"), "https://a.kr/x.jpg");
        assert_eq!(to_https("HTTP://a.kr/x.jpg"), "https://a.kr/x.jpg");
        assert_eq!(to_https("Http://a.kr"), "https://a.kr");
        assert_eq!(to_https(""), "");
    }

    #[test]
    fn test_denied_domain_and_subdomain_rejected_without_probe() {
        let http = Arc::new(FakeHttp::new());
        http.head_image("https://img.example.com/a.jpg", 2000);
        let v = validator(&http);

        assert_eq!(
            v.check("http://img.example.com/a.jpg"),
            Err(Rejection::DeniedDomain("img.example.com".into()))
        );
        assert_eq!(v.validate("https://example.com/b.png"), "");
        assert_eq!(v.validate("http://localhost:8080/c.png"), "");
        assert_eq!(http.head_count(), 0);
    }

    #[test]
    fn test_lookalike_domain_not_denied() {
        let http = Arc::new(FakeHttp::new());
        http.head_image("https://notexample.com/a.jpg", 2000);
        assert_eq!(
            validator(&http).validate("https://notexample.com/a.jpg"),
            "https://notexample.com/a.jpg"
        );
    }

    #[test]
    fn test_missing_extension_rejected_before_probe() {
        let http = Arc::new(FakeHttp::new());
        let v = validator(&http);

        assert_eq!(v.check("https://cdn.test/photo"), Err(Rejection::Extension));
        assert_eq!(v.check("https://cdn.test/photo.gif"), Err(Rejection::Extension));
        assert_eq!(v.check("https://cdn.test/a.jpg/photo"), Err(Rejection::Extension));
        assert_eq!(http.head_count(), 0);
    }

    #[test]
    fn test_http_upgraded_and_accepted() {
        let http = Arc::new(FakeHttp::new());
        http.head_image("https://tong.example.kr/img/Photo.JPG", 2048);
        assert_eq!(
            validator(&http).validate("http://tong.example.kr/img/Photo.JPG"),
            "https://tong.example.kr/img/Photo.JPG"
        );
        assert_eq!(http.head_count(), 1);
    }

    #[test]
    fn test_content_length_out_of_bounds_rejected() {
        let http = Arc::new(FakeHttp::new());
        http.head_image("https://cdn.test/small.png", 100);
        http.head_image("https://cdn.test/huge.png", 1_000_000);
        let v = validator(&http);

        assert_eq!(v.check("https://cdn.test/small.png"), Err(Rejection::Size(100)));
        assert_eq!(
            v.check("https://cdn.test/huge.png"),
            Err(Rejection::Size(1_000_000))
        );
    }

    #[test]
    fn test_missing_content_length_accepted() {
        let http = Arc::new(FakeHttp::new());
        http.head("https://cdn.test/a.webp", 200, Some("image/webp"), None);
        assert_eq!(
            validator(&http).validate("https://cdn.test/a.webp"),
            "https://cdn.test/a.webp"
        );
    }

    #[test]
    fn test_bad_status_or_type_rejected() {
        let http = Arc::new(FakeHttp::new());
        http.head("https://cdn.test/gone.jpg", 404, Some("image/jpeg"), Some(2000));
        http.head("https://cdn.test/page.jpg", 200, Some("text/html"), Some(2000));
        let v = validator(&http);

        assert_eq!(v.check("https://cdn.test/gone.jpg"), Err(Rejection::Status(404)));
        assert!(matches!(
            v.check("https://cdn.test/page.jpg"),
            Err(Rejection::ContentType(_))
        ));
        // unknown url: the fake fails the request
        assert!(matches!(
            v.check("https://cdn.test/unknown.jpg"),
            Err(Rejection::Transport(_))
        ));
    }

    #[test]
    fn test_skip_host_and_disabled_head() {
        let http = Arc::new(FakeHttp::new());
        let v = validator(&http);
        assert_eq!(
            v.validate("http://tong.visitkorea.or.kr/cms/a.jpg"),
            "https://tong.visitkorea.or.kr/cms/a.jpg"
        );

        let mut cfg = config();
        cfg.require_head_ok = false;
        let v = ImageValidator::new(cfg, http.clone());
        assert_eq!(v.validate("https://cdn.test/a.png"), "https://cdn.test/a.png");
        assert_eq!(http.head_count(), 0);
    }

    #[test]
    fn test_fetch_bounds_and_sniffing() {
        let http = Arc::new(FakeHttp::new());
        let mut png = PNG_MAGIC.to_vec();
        png.resize(2000, 0);
        http.get_bytes("https://cdn.test/ok.png", 200, "image/png", png.clone());

        let mut big = PNG_MAGIC.to_vec();
        big.resize(5000, 0);
        http.get_bytes("https://cdn.test/big.png", 200, "image/png", big);

        let mut tiny = PNG_MAGIC.to_vec();
        tiny.resize(10, 0);
        http.get_bytes("https://cdn.test/tiny.png", 200, "image/png", tiny);

        let mut html = b"<!doctype html><html>".to_vec();
        html.resize(2000, b' ');
        http.get_bytes("https://cdn.test/html.png", 200, "image/png", html);

        let v = validator(&http);
        assert_eq!(v.fetch("http://cdn.test/ok.png").unwrap(), png);
        // aborted at max_bytes + 1
        assert_eq!(v.fetch("https://cdn.test/big.png"), Err(Rejection::Size(4097)));
        assert_eq!(v.fetch("https://cdn.test/tiny.png"), Err(Rejection::Size(10)));
        assert_eq!(v.fetch("https://cdn.test/html.png"), Err(Rejection::NotImage));
        assert!(matches!(
            v.fetch("https://example.com/x.png"),
            Err(Rejection::DeniedDomain(_))
        ));
    }
}
