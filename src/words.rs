use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::fs;
use std::path::Path;

const EMBEDDED: &str = include_str!("../data/words.txt");

/// Source of short random words used to namespace proxy paths.
pub trait WordSource {
    fn random_word(&mut self) -> String;

    fn random_words(&mut self, n: usize) -> Vec<String> {
        (0..n).map(|_| self.random_word()).collect()
    }
}

pub struct WordList {
    words: Vec<String>,
    rng: StdRng,
}

impl WordList {
    pub fn embedded() -> Result<Self> {
        Self::from_text(EMBEDDED).context("embedded word list")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read word list {}", path.display()))?;
        Self::from_text(&raw).with_context(|| format!("word list {}", path.display()))
    }

    /// Keeps only lines that are safe as a single URL path segment.
    pub fn from_text(raw: &str) -> Result<Self> {
        let words: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty() && w.bytes().all(|b| b.is_ascii_lowercase()))
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            bail!("no usable words (expected lowercase ascii, one per line)");
        }
        Ok(Self {
            words,
            rng: StdRng::from_os_rng(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordSource for WordList {
    fn random_word(&mut self) -> String {
        // from_text guarantees at least one word
        self.words
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }
}
