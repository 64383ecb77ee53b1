mod defaults;
pub mod rules;

use std::{fs, path::Path};

use thiserror::Error;

use crate::domain::PostData;

pub use defaults::default_rule_specs;
pub use rules::{LowReputationRule, PatternRule, Rule, RuleSpec};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("rule {rule:?} has an invalid pattern")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to read rules file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules file")]
    Parse(#[from] serde_json::Error),
    #[error("rule set is empty")]
    Empty,
}

/// Ordered rule list; the first matching rule names the reason.
pub struct Classifier {
    rules: Vec<Box<dyn Rule>>,
}

impl Classifier {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, ClassifierError> {
        if specs.is_empty() {
            return Err(ClassifierError::Empty);
        }
        let rules = specs
            .into_iter()
            .map(|spec| {
                tracing::debug!(target: "classifier", rule = spec.name(), "compiling rule");
                spec.build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn builtin() -> Result<Self, ClassifierError> {
        Self::from_specs(default_rule_specs())
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let specs: Vec<RuleSpec> = serde_json::from_str(raw)?;
        Self::from_specs(specs)
    }

    /// Loads the rules file when one is configured, otherwise the built-in set.
    pub fn load(path: Option<&Path>) -> Result<Self, ClassifierError> {
        let classifier = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ClassifierError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_json(&raw)?
            }
            None => Self::builtin()?,
        };
        tracing::info!(
            target: "classifier",
            rules = ?classifier.rule_names(),
            source = path.map(|p| p.display().to_string()).as_deref().unwrap_or("builtin"),
            "rule set loaded"
        );
        Ok(classifier)
    }

    pub fn classify(&self, post: &PostData) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(post))
            .map(|rule| rule.name())
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }
}
