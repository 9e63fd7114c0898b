use crate::model::Intent;
use std::collections::HashMap;

/// Canned responses keyed by intent.
#[derive(Debug, Clone)]
pub struct ResponseTemplates {
    responses: HashMap<Intent, String>,
}

impl ResponseTemplates {
    pub fn empty() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    pub fn with_response(mut self, intent: Intent, response: impl Into<String>) -> Self {
        self.responses.insert(intent, response.into());
        self
    }

    pub fn respond(&self, intent: Intent) -> Option<&str> {
        self.responses.get(&intent).map(String::as_str)
    }
}

impl Default for ResponseTemplates {
    fn default() -> Self {
        Self::empty()
            .with_response(
                Intent::Register,
                "To register, visit the AgriMandi website and click on 'Register as a Farmer'.",
            )
            .with_response(
                Intent::SellCrop,
                "To sell your crops, go to the 'Sell Crops' section and list your items.",
            )
            .with_response(
                Intent::BuyCrop,
                "Visit the 'Marketplace' section to explore and buy available crops.",
            )
            .with_response(
                Intent::MandiRate,
                "Today's mandi rate for wheat is ₹2100 per quintal.",
            )
            .with_response(
                Intent::SeasonalCrops,
                "Currently, wheat, rice, and mustard are in season.",
            )
    }
}
