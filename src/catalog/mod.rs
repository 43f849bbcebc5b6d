//! Client for the Korea Tourism Organization listing API (KorService2).
//!
//! Every operation absorbs its failures: the reason is logged and an empty
//! result returned, so a broken endpoint degrades recommendations instead of
//! failing the search.

pub mod normalize;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::TourApiConfig;
use crate::http::{snippet, HttpResponse, HttpTransport, TransportError};
use crate::images::ImageValidator;
use crate::recommend::Category;

pub use types::{Detail, RawItem};
use types::{AreaEntry, DetailCommon, DetailImage};

const AREA_ROWS: usize = 100;
const SNIPPET_CHARS: usize = 300;
/// Image-first ordering of the listing
const ARRANGE_WITH_IMAGE: &str = "O";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Non-JSON response (status={status}, ct='{content_type}'). Body head: {snippet}")]
    NonJson {
        status: u16,
        content_type: String,
        snippet: String,
    },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("failed to read body: {0}")]
    Body(#[from] std::io::Error),
}

/// Listing filters. Absent fields are not sent.
#[derive(Debug, Default, Clone)]
pub struct ListQuery<'a> {
    pub area_code: Option<&'a str>,
    pub sigungu_code: Option<&'a str>,
    pub category: Option<Category>,
    pub count: usize,
}

pub struct TourismCatalogClient {
    config: TourApiConfig,
    service_key: String,
    http: Arc<dyn HttpTransport>,
}

impl TourismCatalogClient {
    pub fn new(config: TourApiConfig, http: Arc<dyn HttpTransport>) -> Self {
        let service_key = normalize::decode_service_key(&config.api_key);
        Self {
            config,
            service_key,
            http,
        }
    }

    /// Area code whose name contains `region` (administrative suffix removed).
    /// Falls back to the first listed area when nothing matches.
    pub fn resolve_area_code(&self, region: &str) -> Option<String> {
        let payload = match self.call("areaCode2", AREA_ROWS, &[]) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("endpoint=areaCode2 outcome=error err={e}");
                return None;
            }
        };

        let entries: Vec<AreaEntry> = types::items(&payload);
        let name = normalize::strip_admin_suffixes(region);

        let matched = entries
            .iter()
            .find(|e| !name.is_empty() && e.name.contains(&name))
            .or_else(|| entries.first())
            .map(|e| e.code.clone())
            .filter(|code| !code.is_empty());

        log::debug!("endpoint=areaCode2 region={region} code={matched:?}");
        matched
    }

    /// District-level resolution is not offered by this client; listings are
    /// filtered at area level only.
    pub fn resolve_sigungu_code(&self, _area_code: &str, _region: &str) -> Option<String> {
        None
    }

    /// Up to `count` listing entries, those with a representative image first.
    pub fn list_by_area(&self, query: &ListQuery<'_>) -> Vec<RawItem> {
        let mut extra: Vec<(&str, String)> = vec![("arrange", ARRANGE_WITH_IMAGE.to_string())];
        if let Some(code) = query.area_code {
            extra.push(("areaCode", code.to_string()));
        }
        if let Some(code) = query.sigungu_code {
            extra.push(("sigunguCode", code.to_string()));
        }
        if let Some(category) = query.category {
            extra.push(("cat1", category.code().to_string()));
        }

        match self.call("areaBasedList2", query.count, &extra) {
            Ok(payload) => {
                let items: Vec<RawItem> = types::items(&payload);
                log::debug!("endpoint=areaBasedList2 outcome=success items={}", items.len());
                items
            }
            Err(e) => {
                log::warn!("endpoint=areaBasedList2 outcome=error err={e}");
                Vec::new()
            }
        }
    }

    /// Overview and normalized homepage; both empty on failure.
    pub fn fetch_detail(&self, content_id: &str) -> Detail {
        if content_id.is_empty() {
            return Detail::default();
        }

        match self.call("detailCommon2", 1, &[("contentId", content_id.to_string())]) {
            Ok(payload) => {
                let detail = types::items::<DetailCommon>(&payload)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                Detail {
                    overview: detail.overview.trim().to_string(),
                    homepage: normalize::normalize_homepage(&detail.homepage),
                }
            }
            Err(e) => {
                log::warn!("endpoint=detailCommon2 contentid={content_id} outcome=error err={e}");
                Detail::default()
            }
        }
    }

    /// First admitted image among the original and small image of the
    /// detail-image record; empty when none passes.
    pub fn fetch_detail_image(&self, content_id: &str, validator: &ImageValidator) -> String {
        if content_id.is_empty() {
            return String::new();
        }

        let payload = match self.call("detailImage2", 1, &[("contentId", content_id.to_string())]) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("endpoint=detailImage2 contentid={content_id} outcome=error err={e}");
                return String::new();
            }
        };

        types::items::<DetailImage>(&payload)
            .iter()
            .flat_map(|img| [img.originimgurl.as_str(), img.smallimageurl.as_str()])
            .map(|raw| validator.validate(raw))
            .find(|url| !url.is_empty())
            .unwrap_or_default()
    }

    /// GET `<base>/<endpoint>` with the shared parameters, parsed as JSON.
    fn call(
        &self,
        endpoint: &str,
        rows: usize,
        extra: &[(&str, String)],
    ) -> Result<Value, CatalogError> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));

        let mut params: Vec<(&str, String)> = vec![
            ("serviceKey", self.service_key.clone()),
            ("numOfRows", rows.to_string()),
            ("pageNo", "1".to_string()),
            ("MobileOS", self.config.mobile_os.clone()),
            ("MobileApp", self.config.mobile_app.clone()),
            ("_type", "json".to_string()),
        ];
        params.extend(extra.iter().cloned());

        let resp = self
            .http
            .get(&url, &params, Duration::from_secs(self.config.timeout_secs))?;

        if resp.is_error() {
            return Err(CatalogError::Status(resp.status));
        }

        let payload = parse_json(resp)?;
        if let Some((code, message)) = types::api_failure(&payload) {
            return Err(CatalogError::Api { code, message });
        }

        Ok(payload)
    }
}

/// Parses a JSON body, refusing anything that neither declares JSON nor looks
/// like it. The API answers key and quota errors with XML or HTML.
pub fn parse_json(resp: HttpResponse) -> Result<Value, CatalogError> {
    let status = resp.status;
    let content_type = resp.content_type.clone().unwrap_or_default().to_lowercase();
    let text = resp.text()?;
    let trimmed = text.trim();

    let looks_json = trimmed.starts_with('{') || trimmed.starts_with('[');
    if content_type.contains("json") || looks_json {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Ok(value);
        }
    }

    Err(CatalogError::NonJson {
        status,
        content_type,
        snippet: snippet(trimmed, SNIPPET_CHARS),
    })
}
