//! Trained category model: multinomial naive Bayes over a bag of
//! words, Laplace-smoothed. The fitted model is persisted as a JSON
//! artifact and loaded on startup; when no artifact exists it is
//! fitted once from the embedded training set and written out.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write model artifact {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed model artifact {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to encode model artifact: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Word counts per category plus document counts, everything the
/// posterior needs. BTreeMaps keep prediction and serialization
/// deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BayesModel {
    word_counts: BTreeMap<String, BTreeMap<String, u64>>,
    word_totals: BTreeMap<String, u64>,
    doc_counts: BTreeMap<String, u64>,
    total_docs: u64,
    vocabulary: BTreeSet<String>,
}

impl BayesModel {
    pub fn fit(samples: &[(&str, &str)]) -> Self {
        let mut model = Self::default();
        for (text, category) in samples {
            model.observe(text, category);
        }
        model
    }

    fn observe(&mut self, text: &str, category: &str) {
        let words = tokenize(text);
        if words.is_empty() {
            return;
        }
        let counts = self.word_counts.entry(category.to_string()).or_default();
        let total = self.word_totals.entry(category.to_string()).or_insert(0);
        for word in words {
            *counts.entry(word.clone()).or_insert(0) += 1;
            *total += 1;
            self.vocabulary.insert(word);
        }
        *self.doc_counts.entry(category.to_string()).or_insert(0) += 1;
        self.total_docs += 1;
    }

    pub fn is_trained(&self) -> bool {
        self.total_docs > 0 && !self.vocabulary.is_empty()
    }

    /// Most probable category for the text, or `None` when the model
    /// is untrained or the text carries no usable tokens.
    pub fn predict(&self, text: &str) -> Option<String> {
        if !self.is_trained() {
            return None;
        }
        let words = tokenize(text);
        if words.is_empty() {
            return None;
        }

        let vocab_size = self.vocabulary.len() as f64;
        let mut best: Option<(&str, f64)> = None;

        for (category, counts) in &self.word_counts {
            let docs = *self.doc_counts.get(category).unwrap_or(&0) as f64;
            let word_total = *self.word_totals.get(category).unwrap_or(&0) as f64;

            let mut log_prob = (docs / self.total_docs as f64).ln();
            for word in &words {
                let count = *counts.get(word).unwrap_or(&0) as f64;
                log_prob += ((count + 1.0) / (word_total + vocab_size)).ln();
            }

            match best {
                Some((_, score)) if log_prob <= score => {}
                _ => best = Some((category, log_prob)),
            }
        }

        best.map(|(category, _)| category.to_string())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ModelError::Decode {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ModelError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        let raw = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, raw).map_err(|source| ModelError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 2 && w.len() <= 20)
        .map(|w| w.to_string())
        .collect()
}

/// Seed corpus the model is fitted from when no artifact exists yet.
/// Category labels only: severity always comes from the keyword
/// cascade, never from the model.
const TRAINING_SET: &[(&str, &str)] = &[
    ("printer is jammed and not printing", "Hardware Failure"),
    ("monitor shows no picture", "Hardware Failure"),
    ("keyboard keys are not responding", "Hardware Failure"),
    ("my pc wont boot this morning", "Hardware Failure"),
    ("mouse cursor does not move", "Hardware Failure"),
    ("hard drive makes clicking noise", "Hardware Failure"),
    ("excel crashes when opening files", "Software Issue"),
    ("computer is very slow after the update", "Software Issue"),
    ("application freezes on startup", "Software Issue"),
    ("getting an error message when saving", "Software Issue"),
    ("blue screen during the meeting", "Software Issue"),
    ("installer fails halfway through", "Software Issue"),
    ("wifi keeps dropping in the east wing", "Network Issue"),
    ("no internet connection on my desk", "Network Issue"),
    ("vpn will not connect from home", "Network Issue"),
    ("ethernet port seems dead in room 4", "Network Issue"),
    ("shared drive is unreachable", "Network Issue"),
    ("forgot my password and cannot log in", "Account Support"),
    ("account is locked out after holidays", "Account Support"),
    ("need my login credentials reset", "Account Support"),
    ("new starter needs an account created", "Account Support"),
    ("requesting a second monitor for my desk", "General Support"),
    ("how do i book the projector", "General Support"),
    ("question about printing quotas", "General Support"),
    ("need software licence for design tool", "General Support"),
];

/// Lazily initialized trained model. `OnceCell` makes the
/// fit-on-first-use single-flight: concurrent first requests block on
/// one initializer instead of training twice.
pub struct TrainedModel {
    artifact_path: PathBuf,
    model: OnceCell<BayesModel>,
}

impl TrainedModel {
    pub fn new(artifact_path: PathBuf) -> Self {
        Self {
            artifact_path,
            model: OnceCell::new(),
        }
    }

    pub fn get(&self) -> &BayesModel {
        self.model.get_or_init(|| self.load_or_fit())
    }

    fn load_or_fit(&self) -> BayesModel {
        if self.artifact_path.exists() {
            match BayesModel::load(&self.artifact_path) {
                Ok(model) if model.is_trained() => {
                    log::info!(
                        "loaded classifier model from {}",
                        self.artifact_path.display()
                    );
                    return model;
                }
                Ok(_) => {
                    log::warn!(
                        "classifier artifact {} is empty, refitting",
                        self.artifact_path.display()
                    );
                }
                Err(e) => {
                    log::warn!("discarding unreadable classifier artifact: {e}");
                }
            }
        }

        let model = BayesModel::fit(TRAINING_SET);
        match model.save(&self.artifact_path) {
            Ok(()) => log::info!(
                "fitted classifier model and saved to {}",
                self.artifact_path.display()
            ),
            // Serving from memory still works when the artifact dir
            // is read-only; the next boot just refits.
            Err(e) => log::warn!("could not persist classifier model: {e}"),
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitted_model_predicts_seed_categories() {
        let model = BayesModel::fit(TRAINING_SET);
        assert_eq!(
            model.predict("the printer is broken again").as_deref(),
            Some("Hardware Failure")
        );
        assert_eq!(
            model.predict("cannot log in, password rejected").as_deref(),
            Some("Account Support")
        );
        assert_eq!(
            model.predict("vpn connection drops every hour").as_deref(),
            Some("Network Issue")
        );
    }

    #[test]
    fn untrained_model_predicts_nothing() {
        let model = BayesModel::default();
        assert_eq!(model.predict("printer broken"), None);
    }

    #[test]
    fn empty_or_unusable_text_predicts_nothing() {
        let model = BayesModel::fit(TRAINING_SET);
        assert_eq!(model.predict(""), None);
        assert_eq!(model.predict("!!! ??? ..."), None);
    }

    #[test]
    fn model_round_trips_through_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = BayesModel::fit(TRAINING_SET);
        model.save(&path).unwrap();

        let loaded = BayesModel::load(&path).unwrap();
        assert!(loaded.is_trained());
        assert_eq!(
            loaded.predict("monitor flickers and dies"),
            model.predict("monitor flickers and dies")
        );
    }

    #[test]
    fn trained_model_fits_when_artifact_is_missing_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/model.json");

        let trained = TrainedModel::new(path.clone());
        assert!(trained.get().is_trained());
        assert!(path.exists());

        // A second handle loads the artifact instead of refitting.
        let again = TrainedModel::new(path);
        assert_eq!(
            again.get().predict("printer jam"),
            trained.get().predict("printer jam")
        );
    }

    #[test]
    fn corrupt_artifact_falls_back_to_refit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let trained = TrainedModel::new(path);
        assert!(trained.get().is_trained());
    }
}
