use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::normalize::normalize;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_delimiters, r"[/:\-]");
// Anything that is not a letter or whitespace: digits and punctuation.
re!(re_noise, r"[^\p{L}\s]+");

/// Banking words that never form part of a counterparty name.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "UPI", "IMPS", "NEFT", "RTGS", "BANK", "TXN", "REF", "MB", "CR", "DR", "REV", "TRANSFER",
    "PAYMENT", "BY", "TO", "ID",
];

/// Narration prefixes that announce a `/`-delimited payment record.
pub const DEFAULT_PROTOCOL_MARKERS: &[&str] = &["UPI/"];

const MIN_TOKEN_CHARS: usize = 3;
const MIN_NAME_WORDS: usize = 2;
const MAX_NAME_WORDS: usize = 3;

/// Derives a counterparty name from a narration.
///
/// Narrations carrying a protocol marker are split on `/`, `-` and `:`; the
/// rightmost token that still holds at least two words after noise removal
/// is the name. Everything else (and marker narrations with no such token)
/// falls back to noise removal over the whole narration. Names keep the
/// normalized upper-case form and are at most three words long; an empty
/// string means no name was found.
#[derive(Debug, Clone)]
pub struct NameExtractor {
    stop_words: HashSet<String>,
    protocol_markers: Vec<String>,
}

impl Default for NameExtractor {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            protocol_markers: DEFAULT_PROTOCOL_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl NameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds stop words on top of the defaults.
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words.extend(
            words
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty()),
        );
        self
    }

    /// Adds protocol markers on top of the defaults.
    pub fn with_protocol_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for marker in markers {
            let marker = normalize(marker.as_ref());
            if !marker.is_empty() && !self.protocol_markers.contains(&marker) {
                self.protocol_markers.push(marker);
            }
        }
        self
    }

    pub fn extract(&self, narration: &str) -> String {
        let narration = normalize(narration);

        if self.has_protocol_marker(&narration) {
            if let Some(name) = self.from_delimited_tokens(&narration) {
                return name;
            }
        }

        self.strip_noise(&narration).unwrap_or_default()
    }

    fn has_protocol_marker(&self, narration: &str) -> bool {
        self.protocol_markers.iter().any(|m| narration.contains(m.as_str()))
    }

    fn from_delimited_tokens(&self, narration: &str) -> Option<String> {
        let tokens: Vec<&str> = re_delimiters()
            .split(narration)
            .map(str::trim)
            .filter(|t| self.is_candidate_token(t))
            .collect();

        tokens.into_iter().rev().find_map(|t| self.strip_noise(t))
    }

    fn is_candidate_token(&self, token: &str) -> bool {
        token.chars().count() >= MIN_TOKEN_CHARS
            // payment handles such as NAME@OKAXIS
            && !token.contains('@')
            && !is_numeric(token)
            && !self.stop_words.contains(token)
    }

    fn strip_noise(&self, text: &str) -> Option<String> {
        let cleaned = re_noise().replace_all(text, " ");
        let words: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|w| !self.stop_words.contains(*w))
            .collect();

        if words.len() < MIN_NAME_WORDS {
            return None;
        }
        Some(words[..words.len().min(MAX_NAME_WORDS)].join(" "))
    }
}

fn is_numeric(token: &str) -> bool {
    let mut digits = token.chars().filter(|c| !c.is_whitespace()).peekable();
    digits.peek().is_some() && digits.all(|c| c.is_ascii_digit())
}
