use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One entry of the area-based listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawItem {
    #[serde(deserialize_with = "lenient_string")]
    pub contentid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub addr1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub addr2: String,
    #[serde(deserialize_with = "lenient_string")]
    pub firstimage: String,
    #[serde(deserialize_with = "lenient_string")]
    pub firstimage2: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cat1: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AreaEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetailCommon {
    #[serde(deserialize_with = "lenient_string")]
    pub overview: String,
    #[serde(deserialize_with = "lenient_string")]
    pub homepage: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetailImage {
    #[serde(deserialize_with = "lenient_string")]
    pub originimgurl: String,
    #[serde(deserialize_with = "lenient_string")]
    pub smallimageurl: String,
}

/// Detail fields used for a card; both empty when the lookup failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detail {
    pub overview: String,
    pub homepage: String,
}

/// Accepts strings, numbers and null; the API is inconsistent about which it sends.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// `response.body.items.item`, which the API sends as a list, a single
/// object, or not at all (`"items": ""` when empty).
pub fn item_values(payload: &Value) -> Vec<Value> {
    let item = payload
        .get("response")
        .and_then(|r| r.get("body"))
        .and_then(|b| b.get("items"))
        .and_then(|i| i.get("item"));

    match item {
        Some(Value::Array(items)) => items.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

/// Deserializes every item, skipping entries that are not objects.
pub fn items<T: for<'de> Deserialize<'de>>(payload: &Value) -> Vec<T> {
    item_values(payload)
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(item) => Some(item),
            Err(e) => {
                log::debug!("skipping catalog item: {e}");
                None
            }
        })
        .collect()
}

/// `response.header.resultCode` when present and not the success code.
pub fn api_failure(payload: &Value) -> Option<(String, String)> {
    let header = payload.get("response")?.get("header")?;
    let code = header.get("resultCode")?.as_str()?;
    if code == "0000" {
        return None;
    }
    let message = header
        .get("resultMsg")
        .and_then(|m| m.as_str())
        .unwrap_or_default();
    Some((code.to_string(), message.to_string()))
}
