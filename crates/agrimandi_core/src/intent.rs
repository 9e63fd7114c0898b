use crate::error::{ChatError, Result};
use crate::model::Intent;
use crate::normalize::TextNormalizer;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Maps normalized text to an intent label.
pub trait IntentClassifier {
    fn classify(&self, text: &str) -> anyhow::Result<Intent>;
}

impl IntentClassifier for Box<dyn IntentClassifier> {
    fn classify(&self, text: &str) -> anyhow::Result<Intent> {
        (**self).classify(text)
    }
}

/// Classifier that never recognizes anything, which leaves intent handling
/// out of the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIntentClassifier;

impl IntentClassifier for DisabledIntentClassifier {
    fn classify(&self, _text: &str) -> anyhow::Result<Intent> {
        Ok(Intent::Unknown)
    }
}

/// Whole-word keyword rules; the first rule with a matching phrase wins.
#[derive(Debug, Clone)]
pub struct KeywordIntentClassifier {
    rules: Vec<(Intent, Vec<String>)>,
}

impl KeywordIntentClassifier {
    pub fn new(rules: Vec<(Intent, Vec<String>)>, normalizer: &TextNormalizer) -> Self {
        let rules = rules
            .into_iter()
            .map(|(intent, keywords)| {
                let keywords = keywords
                    .iter()
                    .map(|k| normalizer.normalize(k))
                    .filter(|k| !k.is_empty())
                    .collect();
                (intent, keywords)
            })
            .collect();
        Self { rules }
    }

    /// Parses `{"label": ["keyword", ...], ...}`; labels must be known intents.
    pub fn from_json_str(json: &str, normalizer: &TextNormalizer) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value, normalizer)
    }

    pub fn load_json(path: &Path, normalizer: &TextNormalizer) -> Result<Self> {
        let file = File::open(path)?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        Self::from_value(value, normalizer)
    }

    fn from_value(value: Value, normalizer: &TextNormalizer) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ChatError::InvalidIntents(
                "expected a JSON object of label -> keywords".to_string(),
            ));
        };
        Ok(Self::new(parse_rules(map)?, normalizer))
    }

    pub fn rules(&self) -> &[(Intent, Vec<String>)] {
        &self.rules
    }
}

fn parse_rules(map: Map<String, Value>) -> Result<Vec<(Intent, Vec<String>)>> {
    let mut rules = Vec::with_capacity(map.len());
    for (label, keywords) in map {
        let intent = Intent::from_label(&label);
        if !intent.is_known() {
            return Err(ChatError::InvalidIntents(format!("unknown intent label {label:?}")));
        }
        let Value::Array(items) = keywords else {
            return Err(ChatError::InvalidIntents(format!(
                "keywords for {label:?} must be an array"
            )));
        };
        let mut words = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) => words.push(s),
                other => {
                    return Err(ChatError::InvalidIntents(format!(
                        "keyword {other} for {label:?} is not a string"
                    )))
                }
            }
        }
        rules.push((intent, words));
    }
    Ok(rules)
}

impl Default for KeywordIntentClassifier {
    fn default() -> Self {
        let rules = [
            (Intent::Register, &["register", "registration", "sign up", "signup"][..]),
            (Intent::SellCrop, &["sell", "selling", "list crop"][..]),
            (Intent::BuyCrop, &["buy", "buying", "purchase", "marketplace"][..]),
            (Intent::MandiRate, &["mandi rate", "mandi price", "market rate"][..]),
            (Intent::SeasonalCrops, &["season", "seasonal", "in season"][..]),
        ]
        .into_iter()
        .map(|(intent, words)| (intent, words.iter().map(|w| w.to_string()).collect()))
        .collect();
        Self::new(rules, &TextNormalizer::default())
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, text: &str) -> anyhow::Result<Intent> {
        let padded = format!(" {} ", text.trim());
        let intent = self
            .rules
            .iter()
            .find(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|k| padded.contains(&format!(" {k} ")))
            })
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Unknown);
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::clean_text;

    #[test]
    fn default_rules_cover_every_known_intent() {
        let classifier = KeywordIntentClassifier::default();
        let cases = [
            ("How do I register?", Intent::Register),
            ("I want to sell my mustard", Intent::SellCrop),
            ("where can I buy rice", Intent::BuyCrop),
            ("today's mandi rate please", Intent::MandiRate),
            ("what is in season now", Intent::SeasonalCrops),
            ("tell me a joke", Intent::Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(
                classifier.classify(&clean_text(text)).unwrap(),
                expected,
                "input: {text}"
            );
        }
    }

    #[test]
    fn matches_whole_words_only() {
        let classifier = KeywordIntentClassifier::default();
        assert_eq!(classifier.classify("buyer").unwrap(), Intent::Unknown);
        assert_eq!(classifier.classify("reseller").unwrap(), Intent::Unknown);
    }

    #[test]
    fn json_rules_keep_file_order() {
        let normalizer = TextNormalizer::default();
        let classifier = KeywordIntentClassifier::from_json_str(
            r#"{"buy_crop": ["wheat"], "sell_crop": ["wheat", "sell"]}"#,
            &normalizer,
        )
        .unwrap();
        assert_eq!(classifier.classify("sell wheat").unwrap(), Intent::BuyCrop);
        assert_eq!(classifier.classify("sell rice").unwrap(), Intent::SellCrop);
    }

    #[test]
    fn json_rejects_unknown_labels() {
        let normalizer = TextNormalizer::default();
        let err = KeywordIntentClassifier::from_json_str(r#"{"weather": ["rain"]}"#, &normalizer)
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidIntents(_)));
    }

    #[test]
    fn disabled_classifier_is_always_unknown() {
        assert_eq!(
            DisabledIntentClassifier.classify("register").unwrap(),
            Intent::Unknown
        );
    }
}
