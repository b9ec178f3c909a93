//! Trip-rule evaluation.
//!
//! A small boolean/comparison expression language over named data points.
//! Rules are parsed once at registration into an AST ([`parser`]) and
//! evaluated against the point table ([`eval`]) every time the sniffer
//! lands new data. Rules live in insertion order: "first triggered rule
//! wins" is observable behavior, so the order is deterministic and
//! reproducible, not whatever a hash map yields.

pub mod eval;
pub mod parser;

pub use eval::{eval, EvalError};
pub use parser::{parse, CmpOp, Expr, LogicOp, ParseError};

use std::collections::HashMap;
use thiserror::Error;
use types::PointValue;

/// One registered trip rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub expression: String,
    pub enabled: bool,
    ast: Expr,
}

/// Registration errors. Unparsable rules are rejected here and never
/// stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule '{name}' is already registered")]
    Duplicate { name: String },

    #[error("rule '{name}' does not parse: {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// The first enabled rule whose expression evaluated true.
    Triggered { rule: String, message: String },
    /// No enabled rule triggered.
    Clear,
    /// A rule raised a runtime evaluation error (for example a boolean
    /// point compared with an ordering operator). Non-triggered; the
    /// pass stops at the offending rule.
    Error { rule: String, message: String },
}

impl EvalOutcome {
    pub fn is_triggered(&self) -> bool {
        matches!(self, EvalOutcome::Triggered { .. })
    }
}

/// Rule table plus data-point table.
///
/// Data points are overwritten in place on update: latest value wins, no
/// history. A path that has never been updated evaluates comparisons to
/// `false` ("never seen" means "not asserted").
#[derive(Default)]
pub struct TripEvaluator {
    rules: Vec<Rule>,
    points: HashMap<String, PointValue>,
}

impl TripEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a rule. On parse failure the rule is not
    /// registered and the error carries the position and description.
    pub fn add_rule(&mut self, name: &str, expression: &str) -> Result<(), RuleError> {
        if self.rules.iter().any(|r| r.name == name) {
            return Err(RuleError::Duplicate {
                name: name.to_string(),
            });
        }
        let ast = parse(expression).map_err(|source| RuleError::Parse {
            name: name.to_string(),
            source,
        })?;
        self.rules.push(Rule {
            name: name.to_string(),
            expression: expression.to_string(),
            enabled: true,
            ast,
        });
        Ok(())
    }

    /// Remove a rule by name. Returns whether it existed.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    /// Enable or disable a rule. Returns whether it existed.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Overwrite a data point in place.
    pub fn update_point(&mut self, path: &str, value: PointValue) {
        match self.points.get_mut(path) {
            Some(slot) => *slot = value,
            None => {
                self.points.insert(path.to_string(), value);
            }
        }
    }

    pub fn point(&self, path: &str) -> Option<PointValue> {
        self.points.get(path).copied()
    }

    /// Scan enabled rules in insertion order and return the first
    /// triggered one. A runtime evaluation error in a rule ends the pass
    /// immediately with a non-triggered [`EvalOutcome::Error`].
    pub fn evaluate(&self) -> EvalOutcome {
        for rule in self.rules.iter().filter(|r| r.enabled) {
            match eval(&rule.ast, &self.points) {
                Ok(true) => {
                    return EvalOutcome::Triggered {
                        rule: rule.name.clone(),
                        message: format!("rule '{}' triggered: {}", rule.name, rule.expression),
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    return EvalOutcome::Error {
                        rule: rule.name.clone(),
                        message: e.to_string(),
                    }
                }
            }
        }
        EvalOutcome::Clear
    }
}
