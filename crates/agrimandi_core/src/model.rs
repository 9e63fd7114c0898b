use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Hit,
    Suggest,
    Miss,
}

/// Best fuzzy match of a query against the FAQ questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqMatch {
    pub question: String,
    pub answer: Option<String>,
    pub score: u8,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Register,
    SellCrop,
    BuyCrop,
    MandiRate,
    SeasonalCrops,
    Unknown,
}

impl Intent {
    pub const KNOWN: [Intent; 5] = [
        Intent::Register,
        Intent::SellCrop,
        Intent::BuyCrop,
        Intent::MandiRate,
        Intent::SeasonalCrops,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Register => "register",
            Intent::SellCrop => "sell_crop",
            Intent::BuyCrop => "buy_crop",
            Intent::MandiRate => "mandi_rate",
            Intent::SeasonalCrops => "seasonal_crops",
            Intent::Unknown => "unknown",
        }
    }

    /// Labels outside the closed vocabulary map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|intent| intent.as_str() == label.trim())
            .unwrap_or(Intent::Unknown)
    }

    pub fn is_known(self) -> bool {
        self != Intent::Unknown
    }
}
