use crate::error::{ChatError, Result};
use crate::model::FaqEntry;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Question/answer pairs in file order. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct FaqStore {
    entries: Vec<FaqEntry>,
}

impl FaqStore {
    pub fn from_entries(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    /// Parses a JSON object mapping question strings to answer strings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ChatError::InvalidFaq(
                "expected a JSON object of question -> answer".to_string(),
            ));
        };
        Self::from_map(map)
    }

    fn from_map(map: Map<String, Value>) -> Result<Self> {
        let mut entries = Vec::with_capacity(map.len());
        for (question, answer) in map {
            let Value::String(answer) = answer else {
                return Err(ChatError::InvalidFaq(format!(
                    "answer for {question:?} is not a string"
                )));
            };
            entries.push(FaqEntry { question, answer });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn answer_for(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.answer.as_str())
    }
}
