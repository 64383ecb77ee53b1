use regex::Regex;
use serde::Deserialize;

use crate::domain::PostData;

use super::ClassifierError;

/// A named spam predicate.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;
    fn matches(&self, post: &PostData) -> bool;
}

/// Regex search over the normalized body.
#[derive(Debug)]
pub struct PatternRule {
    name: String,
    pattern: Regex,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, ClassifierError> {
        let name = name.into();
        let pattern = compile(&name, pattern)?;
        Ok(Self { name, pattern })
    }
}

impl Rule for PatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, post: &PostData) -> bool {
        self.pattern.is_match(&post.body)
    }
}

/// Fires when the author's reputation is strictly below `below` and the body matches.
#[derive(Debug)]
pub struct LowReputationRule {
    name: String,
    below: i64,
    pattern: Regex,
}

impl LowReputationRule {
    pub fn new(name: impl Into<String>, below: i64, pattern: &str) -> Result<Self, ClassifierError> {
        let name = name.into();
        let pattern = compile(&name, pattern)?;
        Ok(Self {
            name,
            below,
            pattern,
        })
    }
}

impl Rule for LowReputationRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, post: &PostData) -> bool {
        post.author_reputation < self.below && self.pattern.is_match(&post.body)
    }
}

/// Fires on an all-caps title line, or on a stretch of at least `min_line_length` characters
/// without lowercase ASCII letters that starts on a line containing a capital and ends at a
/// newline. The stretch may cover several lines.
#[derive(Debug)]
pub struct AllCapsRule {
    name: String,
    min_line_length: usize,
}

impl AllCapsRule {
    pub fn new(name: impl Into<String>, min_line_length: usize) -> Self {
        Self {
            name: name.into(),
            min_line_length,
        }
    }
}

impl Rule for AllCapsRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, post: &PostData) -> bool {
        if is_shouting(post.title()) {
            return true;
        }
        let body = &post.body;
        body.match_indices('\n').any(|(idx, _)| self.shouting_from(&body[idx + 1..]))
    }
}

impl AllCapsRule {
    fn shouting_from(&self, rest: &str) -> bool {
        let first_line = rest.split('\n').next().unwrap_or_default();
        if !first_line.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        let mut last_break = None;
        for (offset, ch) in rest.chars().enumerate() {
            if ch.is_ascii_lowercase() {
                break;
            }
            if ch == '\n' {
                last_break = Some(offset);
            }
        }
        last_break.is_some_and(|len| len >= self.min_line_length)
    }
}

fn is_shouting(line: &str) -> bool {
    line.bytes().any(|b| b.is_ascii_uppercase()) && !line.bytes().any(|b| b.is_ascii_lowercase())
}

fn compile(name: &str, pattern: &str) -> Result<Regex, ClassifierError> {
    Regex::new(pattern).map_err(|source| ClassifierError::Pattern {
        rule: name.to_string(),
        source,
    })
}

/// Serializable rule definition, as found in a rules file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    Pattern {
        name: String,
        pattern: String,
    },
    LowReputation {
        name: String,
        below: i64,
        pattern: String,
    },
    AllCaps {
        name: String,
        #[serde(default = "default_min_line_length")]
        min_line_length: usize,
    },
}

fn default_min_line_length() -> usize {
    15
}

impl RuleSpec {
    pub fn name(&self) -> &str {
        match self {
            RuleSpec::Pattern { name, .. }
            | RuleSpec::LowReputation { name, .. }
            | RuleSpec::AllCaps { name, .. } => name,
        }
    }

    pub fn build(self) -> Result<Box<dyn Rule>, ClassifierError> {
        let rule: Box<dyn Rule> = match self {
            RuleSpec::Pattern { name, pattern } => Box::new(PatternRule::new(name, &pattern)?),
            RuleSpec::LowReputation {
                name,
                below,
                pattern,
            } => Box::new(LowReputationRule::new(name, below, &pattern)?),
            RuleSpec::AllCaps {
                name,
                min_line_length,
            } => Box::new(AllCapsRule::new(name, min_line_length)),
        };
        Ok(rule)
    }
}
