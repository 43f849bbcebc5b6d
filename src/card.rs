use serde::{Deserialize, Serialize};

pub const NAME_PLACEHOLDER: &str = "이름 정보 없음";
pub const REASON_PLACEHOLDER: &str = "한 줄 설명 없음";
pub const ADDRESS_PLACEHOLDER: &str = "주소 정보 없음";

/// One recommendation. Every field is always present; `image_url` and
/// `homepage` are empty strings when unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub metadata: CardMetadata,
}

/// Raw provenance of a card, kept for debugging and re-use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardMetadata {
    pub contentid: String,
    pub cat1: String,
    pub addr1: String,
    pub firstimage2: String,
    pub title: String,
    pub region: String,
}

/// Enriched fields of a card before placeholder substitution.
#[derive(Debug, Default)]
pub struct CardParts {
    pub name: String,
    pub reason: String,
    pub address: String,
    pub image_url: String,
    pub homepage: String,
    pub metadata: CardMetadata,
}

impl Card {
    pub fn assemble(parts: CardParts) -> Self {
        Self {
            name: or_placeholder(parts.name, NAME_PLACEHOLDER),
            reason: or_placeholder(parts.reason, REASON_PLACEHOLDER),
            address: or_placeholder(parts.address, ADDRESS_PLACEHOLDER),
            image_url: parts.image_url,
            homepage: parts.homepage,
            metadata: parts.metadata,
        }
    }
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value
    }
}

/// Joins the two address fragments with a space, skipping empty ones.
pub fn compose_address(addr1: &str, addr2: &str) -> String {
    match (addr1.trim(), addr2.trim()) {
        ("", "") => String::new(),
        (a, "") | ("", a) => a.to_string(),
        (a, b) => format!("{a} {b}"),
    }
}
