use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level (`cat1`) destination classifier of the tourism catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "A01")]
    Nature,
    #[serde(rename = "A02")]
    Culture,
    #[serde(rename = "A03")]
    Leisure,
    #[serde(rename = "A04")]
    Shopping,
    #[serde(rename = "A05")]
    Food,
    #[serde(rename = "B02")]
    Lodging,
    #[serde(rename = "C01")]
    Course,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Nature,
        Category::Culture,
        Category::Leisure,
        Category::Shopping,
        Category::Food,
        Category::Lodging,
        Category::Course,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Category::Nature => "A01",
            Category::Culture => "A02",
            Category::Leisure => "A03",
            Category::Shopping => "A04",
            Category::Food => "A05",
            Category::Lodging => "B02",
            Category::Course => "C01",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Nature => "자연",
            Category::Culture => "인문(문화/예술/역사)",
            Category::Leisure => "레포츠",
            Category::Shopping => "쇼핑",
            Category::Food => "음식",
            Category::Lodging => "숙박",
            Category::Course => "추천코스",
        }
    }

    /// Case-insensitive lookup; anything outside the closed set is `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_uppercase();
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}
