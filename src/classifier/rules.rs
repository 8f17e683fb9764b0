//! Keyword taxonomy for rule-based classification.
//!
//! Both the category rules (strategy A) and the severity cascade (used
//! under every strategy) are ordered data, not branching logic, so the
//! help desk can retune them from a TOML file without a deploy.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::shared::enums::Severity;

pub const DEFAULT_CATEGORY: &str = "General Support";
pub const DEFAULT_SEVERITY: Severity = Severity::Medium;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// One category rule: first rule whose keyword matches wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

/// One step of the severity cascade, again first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityRule {
    pub severity: Severity,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRules {
    pub categories: Vec<CategoryRule>,
    pub severities: Vec<SeverityRule>,
}

impl ClassifierRules {
    pub fn from_toml_file(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| RulesError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// First category whose keyword set matches the lower-cased text.
    pub fn category_for(&self, text: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|rule| matches_any(text, &rule.keywords))
            .map(|rule| rule.category.as_str())
    }

    /// Severity from the cascade over the raw description text. Falls
    /// back to the default when nothing matches.
    pub fn severity_for(&self, text: &str) -> Severity {
        self.severities
            .iter()
            .find(|rule| matches_any(text, &rule.keywords))
            .map(|rule| rule.severity)
            .unwrap_or(DEFAULT_SEVERITY)
    }
}

fn matches_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| text.contains(kw.as_str()))
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryRule {
                    category: "Safety Hazard".to_string(),
                    keywords: keywords(&[
                        "smoke",
                        "fire",
                        "sparks",
                        "burning smell",
                        "electric shock",
                        "overheating",
                    ]),
                },
                CategoryRule {
                    category: "Hardware Failure".to_string(),
                    keywords: keywords(&[
                        "printer",
                        "monitor",
                        "screen black",
                        "keyboard",
                        "mouse",
                        "wont boot",
                        "won't boot",
                        "no power",
                        "hard drive",
                        "broken",
                        "dead",
                    ]),
                },
                CategoryRule {
                    category: "Software Issue".to_string(),
                    keywords: keywords(&[
                        "slow",
                        "freeze",
                        "frozen",
                        "crash",
                        "error",
                        "blue screen",
                        "not responding",
                        "update failed",
                        "install",
                    ]),
                },
                CategoryRule {
                    category: "Network Issue".to_string(),
                    keywords: keywords(&[
                        "wifi",
                        "internet",
                        "network",
                        "vpn",
                        "no connection",
                        "ethernet",
                    ]),
                },
                CategoryRule {
                    category: "Account Support".to_string(),
                    keywords: keywords(&[
                        "password",
                        "login",
                        "log in",
                        "locked out",
                        "account",
                        "credentials",
                    ]),
                },
            ],
            severities: vec![
                SeverityRule {
                    severity: Severity::Critical,
                    keywords: keywords(&[
                        "smoke",
                        "fire",
                        "sparks",
                        "burning smell",
                        "electric shock",
                        "data loss",
                        "server down",
                    ]),
                },
                SeverityRule {
                    severity: Severity::High,
                    keywords: keywords(&[
                        "printer",
                        "monitor",
                        "screen black",
                        "keyboard",
                        "mouse",
                        "wont boot",
                        "won't boot",
                        "no power",
                        "broken",
                        "dead",
                        "cannot work",
                    ]),
                },
                SeverityRule {
                    severity: Severity::Medium,
                    keywords: keywords(&[
                        "slow",
                        "freeze",
                        "frozen",
                        "crash",
                        "error",
                        "login fail",
                        "locked out",
                        "vpn",
                    ]),
                },
                SeverityRule {
                    severity: Severity::Low,
                    keywords: keywords(&[
                        "how do i",
                        "how to",
                        "request",
                        "question",
                        "when possible",
                        "new starter",
                    ]),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn printer_reports_are_hardware_failures() {
        let rules = ClassifierRules::default();
        let text = "printer not working";
        assert_eq!(rules.category_for(text), Some("Hardware Failure"));
        assert_eq!(rules.severity_for(text), Severity::High);
    }

    #[test]
    fn safety_keywords_outrank_hardware_keywords() {
        let rules = ClassifierRules::default();
        // Mentions a printer, but the smoke wins on priority.
        let text = "smoke coming out of the printer";
        assert_eq!(rules.category_for(text), Some("Safety Hazard"));
        assert_eq!(rules.severity_for(text), Severity::Critical);
    }

    #[test]
    fn hardware_outranks_software_wording() {
        let rules = ClassifierRules::default();
        let text = "monitor keeps crashing and is slow";
        assert_eq!(rules.category_for(text), Some("Hardware Failure"));
    }

    #[test]
    fn unmatched_text_has_no_category_and_default_severity() {
        let rules = ClassifierRules::default();
        let text = "something odd happened yesterday";
        assert_eq!(rules.category_for(text), None);
        assert_eq!(rules.severity_for(text), DEFAULT_SEVERITY);
    }

    #[test]
    fn howto_wording_is_low_severity() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.severity_for("how do i set up my mail signature"),
            Severity::Low
        );
    }

    #[test]
    fn rules_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[categories]]
category = "Coffee Machine"
keywords = ["espresso", "grinder"]

[[severities]]
severity = "HIGH"
keywords = ["espresso"]
"#
        )
        .unwrap();

        let rules = ClassifierRules::from_toml_file(file.path()).unwrap();
        assert_eq!(rules.category_for("espresso is out"), Some("Coffee Machine"));
        assert_eq!(rules.severity_for("espresso is out"), Severity::High);
        assert_eq!(rules.severity_for("grinder jammed"), DEFAULT_SEVERITY);
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let err = ClassifierRules::from_toml_file(Path::new("/nonexistent/rules.toml"));
        assert!(matches!(err, Err(RulesError::Read { .. })));
    }
}
