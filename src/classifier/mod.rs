//! Ticket classification: free-text description in, category plus
//! severity out.
//!
//! Category assignment is a pluggable strategy (keyword rules or the
//! trained model). Severity is the stable half of the contract: it is
//! always derived from the keyword cascade over the raw description,
//! independent of how the category was picked. Classification never
//! fails outward; internal faults degrade to the default pair.

pub mod bayes;
pub mod rules;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{ClassifierConfig, ClassifierStrategy};
use crate::core::shared::enums::Severity;
use bayes::TrainedModel;
use rules::{ClassifierRules, DEFAULT_CATEGORY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub severity: Severity,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("no category prediction for input")]
    NoPrediction,
}

/// Category half of the classifier. Implementations see the
/// lower-cased description text.
pub trait Categorizer: Send + Sync {
    fn name(&self) -> &'static str;
    fn categorize(&self, text: &str) -> Result<String, ClassifierError>;
}

struct RuleCategorizer {
    rules: ClassifierRules,
}

impl Categorizer for RuleCategorizer {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn categorize(&self, text: &str) -> Result<String, ClassifierError> {
        Ok(self
            .rules
            .category_for(text)
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string())
    }
}

struct BayesCategorizer {
    model: TrainedModel,
}

impl Categorizer for BayesCategorizer {
    fn name(&self) -> &'static str {
        "bayes"
    }

    fn categorize(&self, text: &str) -> Result<String, ClassifierError> {
        self.model
            .get()
            .predict(text)
            .ok_or(ClassifierError::NoPrediction)
    }
}

pub struct ClassifierEngine {
    categorizer: Box<dyn Categorizer>,
    rules: ClassifierRules,
}

impl ClassifierEngine {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let rules = match &config.rules_path {
            Some(path) => match ClassifierRules::from_toml_file(path) {
                Ok(rules) => {
                    log::info!("loaded classifier rules from {}", path.display());
                    rules
                }
                Err(e) => {
                    log::warn!("falling back to built-in classifier rules: {e}");
                    ClassifierRules::default()
                }
            },
            None => ClassifierRules::default(),
        };

        let categorizer: Box<dyn Categorizer> = match config.strategy {
            ClassifierStrategy::Rules => Box::new(RuleCategorizer {
                rules: rules.clone(),
            }),
            ClassifierStrategy::Bayes => Box::new(BayesCategorizer {
                model: TrainedModel::new(config.model_path.clone()),
            }),
        };

        Self { categorizer, rules }
    }

    /// Build an engine from explicit parts. Used by tests and by any
    /// embedder that wants a non-default taxonomy.
    pub fn with_parts(categorizer: Box<dyn Categorizer>, rules: ClassifierRules) -> Self {
        Self { categorizer, rules }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.categorizer.name()
    }

    /// Touch the underlying strategy so lazy fitting happens during
    /// boot rather than on the first request.
    pub fn warm(&self) {
        let _ = self.categorizer.categorize("warm up");
        log::info!("classifier ready (strategy: {})", self.strategy_name());
    }

    pub fn classify(&self, description: &str) -> Classification {
        let text = description.to_lowercase();

        let category = match self.categorizer.categorize(&text) {
            Ok(category) => category,
            Err(e) => {
                log::warn!("category prediction failed, using default: {e}");
                DEFAULT_CATEGORY.to_string()
            }
        };

        // Severity reads the raw lower-cased text, never the category.
        let severity = self.rules.severity_for(&text);

        Classification { category, severity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rules_engine() -> ClassifierEngine {
        let rules = ClassifierRules::default();
        ClassifierEngine::with_parts(
            Box::new(RuleCategorizer {
                rules: rules.clone(),
            }),
            rules,
        )
    }

    fn bayes_engine(model_path: PathBuf) -> ClassifierEngine {
        ClassifierEngine::with_parts(
            Box::new(BayesCategorizer {
                model: TrainedModel::new(model_path),
            }),
            ClassifierRules::default(),
        )
    }

    #[test]
    fn printer_description_classifies_hardware_high() {
        let got = rules_engine().classify("Printer not working");
        assert_eq!(got.category, "Hardware Failure");
        assert_eq!(got.severity, Severity::High);
    }

    #[test]
    fn smoke_is_critical_under_both_strategies() {
        let dir = tempfile::tempdir().unwrap();

        let rules = rules_engine().classify("There is SMOKE coming from the tower");
        assert_eq!(rules.severity, Severity::Critical);

        let bayes = bayes_engine(dir.path().join("model.json"))
            .classify("There is SMOKE coming from the tower");
        assert_eq!(bayes.severity, Severity::Critical);
    }

    #[test]
    fn unmatched_description_gets_default_pair() {
        let got = rules_engine().classify("the thing by the window looks different");
        assert_eq!(got.category, "General Support");
        assert_eq!(got.severity, Severity::Medium);
    }

    #[test]
    fn bayes_failure_degrades_to_default_category() {
        let dir = tempfile::tempdir().unwrap();
        let engine = bayes_engine(dir.path().join("model.json"));

        // Nothing tokenizable: prediction fails, classify still answers.
        let got = engine.classify("??!");
        assert_eq!(got.category, "General Support");
        assert_eq!(got.severity, Severity::Medium);
    }

    #[test]
    fn bayes_severity_still_comes_from_the_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let engine = bayes_engine(dir.path().join("model.json"));

        let got = engine.classify("printer not working");
        assert_eq!(got.category, "Hardware Failure");
        assert_eq!(got.severity, Severity::High);
    }
}
