use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ProtocolId;
use crate::model::protocol::ProtocolDetails;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown protocol category: {0}")]
pub struct UnknownCategory(pub String);

/// Library sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Morning,
    Sleep,
    Exercise,
    Nutrition,
    Focus,
    Recovery,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Morning,
        Category::Sleep,
        Category::Exercise,
        Category::Nutrition,
        Category::Focus,
        Category::Recovery,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Morning => "morning",
            Category::Sleep => "sleep",
            Category::Exercise => "exercise",
            Category::Nutrition => "nutrition",
            Category::Focus => "focus",
            Category::Recovery => "recovery",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// A curated library entry attributed to an expert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProtocol {
    pub id: ProtocolId,
    pub title: String,
    pub category: Category,
    pub author: String,
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub difficulty: Difficulty,
    pub time_required: String,
    pub frequency: String,
}

impl CatalogProtocol {
    /// Metadata snapshot stored on the wall when this entry is added.
    #[must_use]
    pub fn to_details(&self) -> ProtocolDetails {
        ProtocolDetails {
            title: self.title.clone(),
            description: Some(self.description.clone()),
            category: Some(self.category.as_str().to_owned()),
            difficulty: Some(self.difficulty.as_str().to_owned()),
            time_required: Some(self.time_required.clone()),
            frequency: Some(self.frequency.clone()),
            benefits: self.benefits.clone(),
            instructions: self.instructions.clone(),
        }
    }
}
