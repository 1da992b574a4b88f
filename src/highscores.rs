//! Persisted best score
//!
//! A single scalar stored as JSON (`{"best": N}`). Older files holding a bare
//! number are accepted too. Anything absent or unreadable counts as zero.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Best score across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HighScore {
    pub best: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHighScore {
    Record(HighScore),
    Bare(u64),
}

impl HighScore {
    pub fn new(best: u64) -> Self {
        Self { best }
    }

    /// Parse a stored high score
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let stored: StoredHighScore = serde_json::from_str(json)?;
        Ok(match stored {
            StoredHighScore::Record(score) => score,
            StoredHighScore::Bare(best) => Self { best },
        })
    }

    /// Load from disk, zero when absent or malformed
    pub fn load_from(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(_) => {
                log::info!("No high score at {}, starting fresh", path.display());
                return Self::default();
            }
        };

        match Self::from_json(&json) {
            Ok(score) => {
                log::info!("Loaded high score {}", score.best);
                score
            }
            Err(e) => {
                log::warn!("Ignoring malformed high score file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Write to disk via a temp file so a crash never leaves a torn file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        log::info!("High score {} saved", self.best);
        Ok(())
    }

    /// Keep the larger of the stored and given score; true if it improved
    pub fn record(&mut self, score: u64) -> bool {
        if score > self.best {
            self.best = score;
            true
        } else {
            false
        }
    }
}
