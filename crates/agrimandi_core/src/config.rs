use serde::{Deserialize, Serialize};

pub const DEFAULT_FAQ_THRESHOLD: u8 = 65;
pub const DEFAULT_SUGGESTION_MARGIN: u8 = 10;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;
pub const DEFAULT_QA_CONFIDENCE: f32 = 0.3;
pub const DEFAULT_QA_MAX_ANSWER_LEN: usize = 300;

pub const GREETING_RESPONSE: &str = "Hello! How can I assist you in your farming journey today?";

/// Background passage handed to the QA model when nothing else answers.
pub const FALLBACK_CONTEXT: &str = "\
The AgriMandi system helps farmers get fair prices by providing up-to-date mandi rates, crop recommendations, and weather forecasts.
Common crops in India include wheat, rice, mustard, cotton, and sugarcane. Farmers can sell their produce through local mandis or digital platforms.";

/// Tunables for the response pipeline. Every field has a default so a
/// partial config file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub faq_threshold: u8,
    pub suggestion_margin: u8,
    pub max_suggestions: usize,
    pub qa_confidence_threshold: f32,
    pub qa_max_answer_len: usize,
    pub qa_timeout_secs: Option<u64>,
    pub greetings: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            faq_threshold: DEFAULT_FAQ_THRESHOLD,
            suggestion_margin: DEFAULT_SUGGESTION_MARGIN,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            qa_confidence_threshold: DEFAULT_QA_CONFIDENCE,
            qa_max_answer_len: DEFAULT_QA_MAX_ANSWER_LEN,
            qa_timeout_secs: None,
            greetings: ["hello", "hi", "hey", "namaste"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ChatConfig {
    pub fn suggestion_threshold(&self) -> u8 {
        self.faq_threshold.saturating_sub(self.suggestion_margin)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.faq_threshold > 100 {
            return Err("faq_threshold must be within 0..=100".to_string());
        }
        if !(0.0..=1.0).contains(&self.qa_confidence_threshold) {
            return Err("qa_confidence_threshold must be within 0.0..=1.0".to_string());
        }
        if self.max_suggestions == 0 {
            return Err("max_suggestions must be > 0".to_string());
        }
        if self.qa_max_answer_len == 0 {
            return Err("qa_max_answer_len must be > 0".to_string());
        }
        if self.qa_timeout_secs == Some(0) {
            return Err("qa_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ChatConfig::default();
        assert_eq!(cfg.faq_threshold, 65);
        assert_eq!(cfg.suggestion_threshold(), 55);
        assert_eq!(cfg.max_suggestions, 3);
        assert_eq!(cfg.qa_max_answer_len, 300);
        assert!(cfg.greetings.iter().any(|g| g == "namaste"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: ChatConfig = serde_json::from_str(r#"{"faq_threshold": 70}"#).unwrap();
        assert_eq!(cfg.faq_threshold, 70);
        assert_eq!(cfg.suggestion_threshold(), 60);
        assert_eq!(cfg.qa_confidence_threshold, DEFAULT_QA_CONFIDENCE);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cfg = ChatConfig {
            qa_confidence_threshold: 1.5,
            ..ChatConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ChatConfig {
            qa_max_answer_len: 0,
            ..ChatConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_suggestions() {
        let cfg = ChatConfig {
            max_suggestions: 0,
            ..ChatConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err("max_suggestions must be > 0".to_string())
        );
    }
}
