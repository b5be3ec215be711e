use std::collections::{HashMap, HashSet};

use crate::bag::standard_value;

pub const DEFAULT_THEME: &str = "standard";
pub const MIN_WORD_LENGTH: usize = 2;
pub const MAX_WORD_LENGTH: usize = 15;

/// The word validator the engine plays against.
pub trait Dictionary {
    /// Whether `word` is playable, optionally only within one theme.
    fn is_valid(&self, word: &str, theme: Option<&str>) -> bool;

    fn base_points(&self, word: &str) -> Option<u32>;

    fn words_with_length_at_most(&self, max_length: usize) -> Vec<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordData {
    pub base_points: u32,
    pub themes: HashSet<String>,
}

pub type WordDict = HashMap<String, WordData>;

#[derive(Debug, Clone, Default)]
pub struct Judge {
    builtin_dictionary: WordDict,
}

impl Judge {
    pub fn new<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> Self {
        let mut judge = Self::default();
        for word in words {
            judge.add_word(word.as_ref(), DEFAULT_THEME);
        }
        judge
    }

    /// Reads one word per line, optionally followed by the themes it belongs to.
    /// Lines starting with `#` are skipped.
    pub fn from_word_list(list: &str) -> Self {
        let mut judge = Self::default();
        for line in list.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut chunks = line.split_whitespace();
            let Some(word) = chunks.next() else {
                continue;
            };
            let mut themed = false;
            for theme in chunks {
                themed |= judge.add_word(word, theme);
            }
            if !themed {
                judge.add_word(word, DEFAULT_THEME);
            }
        }
        judge
    }

    /// Returns false when the word can't be played at all.
    pub fn add_word(&mut self, word: &str, theme: &str) -> bool {
        let word = word.trim().to_ascii_uppercase();
        let length = word.chars().count();
        if !(MIN_WORD_LENGTH..=MAX_WORD_LENGTH).contains(&length)
            || !word.chars().all(|c| c.is_ascii_alphabetic())
        {
            return false;
        }

        let base_points = word.chars().map(standard_value).sum();
        self.builtin_dictionary
            .entry(word)
            .or_insert_with(|| WordData {
                base_points,
                themes: HashSet::new(),
            })
            .themes
            .insert(theme.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.builtin_dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtin_dictionary.is_empty()
    }
}

impl Dictionary for Judge {
    fn is_valid(&self, word: &str, theme: Option<&str>) -> bool {
        match self.builtin_dictionary.get(&word.to_ascii_uppercase()) {
            Some(data) => theme.map_or(true, |t| data.themes.contains(t)),
            None => false,
        }
    }

    fn base_points(&self, word: &str) -> Option<u32> {
        self.builtin_dictionary
            .get(&word.to_ascii_uppercase())
            .map(|data| data.base_points)
    }

    fn words_with_length_at_most(&self, max_length: usize) -> Vec<&str> {
        self.builtin_dictionary
            .keys()
            .filter(|w| w.len() <= max_length)
            .map(String::as_str)
            .collect()
    }
}
