use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{Html, Selector};

use crate::images::to_https;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static HAS_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());
static HREF_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap());

/// Administrative suffixes dropped before matching a region name against the
/// area list. "특별자치도" goes first so "제주특별자치도" becomes "제주".
const ADMIN_SUFFIXES: [&str; 3] = ["특별자치도", "광역시", "특별시"];

/// Normalize a homepage field into an absolute https URL.
///
/// - Takes the `href` of the first anchor when the field is HTML markup, or a
///   bare `href="..."` attribute outside any tag
/// - Unescapes `&amp;`
/// - Converts protocol-relative URLs, and prefixes bare hosts, with https
///
/// Returns an empty string for an empty field.
pub fn normalize_homepage(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if text.is_empty() {
        return String::new();
    }

    if text.contains("href") {
        let fragment = Html::parse_fragment(&text);
        let href = fragment
            .select(&ANCHOR)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_owned)
            .or_else(|| HREF_ATTR.captures(&text).map(|c| c[1].to_string()));
        if let Some(href) = href {
            text = href.trim().to_string();
        }
    }

    text = text.replace("&amp;", "&");

    if text.starts_with("//") {
        text = format!("https:{text}");
    }
    if !HAS_SCHEME.is_match(&text) {
        text = format!("https://{text}");
    }

    to_https(&text)
}

/// The service key in decoded form: percent-decoded if it looks encoded,
/// with all whitespace removed.
pub fn decode_service_key(raw: &str) -> String {
    let key = raw.trim();
    let decoded = if key.contains('%') {
        percent_decode_str(key).decode_utf8_lossy().into_owned()
    } else {
        key.to_string()
    };
    decoded.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn strip_admin_suffixes(region: &str) -> String {
    ADMIN_SUFFIXES
        .iter()
        .fold(region.to_string(), |acc, suffix| acc.replace(suffix, ""))
        .trim()
        .to_string()
}
