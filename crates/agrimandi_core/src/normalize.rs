//! Free-text normalization shared by the greeting check, the intent
//! classifier and FAQ matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// English stopwords (the NLTK corpus list).
pub const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn html_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid html tag pattern"))
}

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digit pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub lowercase: bool,
    pub strip_punctuation: bool,
    pub strip_digits: bool,
    pub strip_stopwords: bool,
    pub strip_html: bool,
    pub ascii_fold: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true,
            strip_digits: true,
            strip_stopwords: true,
            strip_html: true,
            ascii_fold: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer {
    options: NormalizeOptions,
}

impl TextNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    /// Normalizes `text`. Applying it twice gives the same result as once.
    pub fn normalize(&self, text: &str) -> String {
        let opts = &self.options;
        let mut text = if opts.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        if opts.ascii_fold {
            text = text.nfkd().filter(char::is_ascii).collect();
            // Compatibility decomposition can surface new uppercase letters.
            if opts.lowercase {
                text = text.to_lowercase();
            }
        }

        if opts.strip_html {
            text = html_tag().replace_all(&text, "").into_owned();
        }

        if opts.strip_punctuation {
            text.retain(|c| !c.is_ascii_punctuation());
        }

        if opts.strip_digits {
            text = digit_run().replace_all(&text, "").into_owned();
        }

        let words = text.split_whitespace();
        if opts.strip_stopwords {
            let stop = stopwords();
            words
                .filter(|w| !stop.contains(w))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            words.collect::<Vec<_>>().join(" ")
        }
    }
}

/// Normalizes with every option enabled.
pub fn clean_text(text: &str) -> String {
    TextNormalizer::default().normalize(text)
}
