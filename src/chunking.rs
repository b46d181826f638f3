//! Text segmentation: splitting source texts into the fragments that get embedded.
//!
//! Two strategies are supported:
//! - `Paragraph`: split on blank lines, dropping empty paragraphs
//! - `SlidingWindow`: overlapping windows of whitespace-delimited tokens

use std::fmt;

use crate::errors::Error;

/// Default sliding window size, in tokens.
pub const DEFAULT_WINDOW_SIZE: usize = 240;
/// Default number of tokens shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 8;

/// Splits one source text into an ordered sequence of fragments.
///
/// Implementations must be pure: the same text always yields the same fragments.
pub trait Segmenter: Send {
    /// Segment `text` into fragments, in reading order.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Chunking strategy selected at store construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Split on blank lines (`"\n\n"`).
    Paragraph,
    /// Fixed-size token windows with `overlap` tokens shared between neighbours.
    SlidingWindow { window_size: usize, overlap: usize },
}

impl Default for ChunkingStrategy {
    fn default() -> Self {
        ChunkingStrategy::SlidingWindow {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingStrategy {
    /// Build a strategy from its configuration name.
    ///
    /// `window_size` and `overlap` are ignored for paragraph mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown mode or an unusable window.
    pub fn from_mode(mode: &str, window_size: usize, overlap: usize) -> Result<Self, Error> {
        let strategy = match mode.trim() {
            "paragraph" => ChunkingStrategy::Paragraph,
            "sliding_window" => ChunkingStrategy::SlidingWindow {
                window_size,
                overlap,
            },
            other => {
                return Err(Error::Config(format!(
                    "Invalid chunking strategy: {other} (expected 'paragraph' or 'sliding_window')"
                )));
            }
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Check window parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if let ChunkingStrategy::SlidingWindow {
            window_size,
            overlap,
        } = *self
        {
            if window_size == 0 {
                return Err(Error::Config(
                    "Sliding window size must be greater than 0".to_string(),
                ));
            }
            if overlap >= window_size {
                return Err(Error::Config(format!(
                    "Sliding window overlap ({overlap}) must be smaller than the window size ({window_size})"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkingStrategy::Paragraph => write!(f, "paragraph"),
            ChunkingStrategy::SlidingWindow {
                window_size,
                overlap,
            } => write!(f, "sliding_window({window_size}/{overlap})"),
        }
    }
}

/// Segmenter driven by a [`ChunkingStrategy`].
#[derive(Debug, Clone)]
pub struct Chunker {
    strategy: ChunkingStrategy,
}

impl Chunker {
    /// Create a chunker, validating the strategy parameters.
    pub fn new(strategy: ChunkingStrategy) -> Result<Self, Error> {
        strategy.validate()?;
        Ok(Chunker { strategy })
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }
}

impl Segmenter for Chunker {
    fn segment(&self, text: &str) -> Vec<String> {
        match self.strategy {
            ChunkingStrategy::Paragraph => paragraph_chunks(text),
            ChunkingStrategy::SlidingWindow {
                window_size,
                overlap,
            } => sliding_window_chunks(text, window_size, overlap),
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn paragraph_chunks(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(clean_text)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

fn sliding_window_chunks(text: &str, window_size: usize, overlap: usize) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();

    // Shorter than one window (including empty input): one fragment.
    if tokens.len() < window_size {
        return vec![tokens.join(" ")];
    }

    let step = window_size - overlap;
    // Window starts run while start < len - window + step, so the tail is
    // always covered by a final (possibly short) window.
    let end = tokens.len() - window_size + step;
    (0..end)
        .step_by(step)
        .map(|start| {
            let stop = (start + window_size).min(tokens.len());
            tokens[start..stop].join(" ")
        })
        .collect()
}
