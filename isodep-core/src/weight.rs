//! Weight resolution: constant number or per-candidate expression.

use std::fmt;
use std::sync::Arc;

use crate::candidate::Candidate;
use crate::config::ConfigError;
use crate::expr::{CandidateExpr, ExprError};
use crate::veto::{is_number, to_number};

/// Anything that turns a candidate into a weight.
///
/// The built-in implementation is [`CandidateExpr`]; hosts can plug in
/// their own evaluator through [`Weight::expression`].
pub trait WeightExpression: Send + Sync + fmt::Debug {
    /// Source text, for diagnostics.
    fn text(&self) -> &str;

    fn evaluate(&self, cand: &Candidate) -> Result<f64, ExprError>;
}

impl WeightExpression for CandidateExpr {
    fn text(&self) -> &str {
        CandidateExpr::text(self)
    }

    fn evaluate(&self, cand: &Candidate) -> Result<f64, ExprError> {
        Ok(self.eval(cand))
    }
}

/// Per-source weight. The representation is fixed once resolved.
#[derive(Debug, Clone)]
pub enum Weight {
    Constant(f64),
    Expression(Arc<dyn WeightExpression>),
}

impl Weight {
    /// Classify a configured weight string.
    ///
    /// Plain numbers become constants; anything else is compiled as a
    /// candidate expression.
    pub fn resolve(text: &str) -> Result<Self, ConfigError> {
        if is_number(text) {
            return Ok(Weight::Constant(to_number(text)?));
        }
        let expr = CandidateExpr::compile(text).map_err(|error| ConfigError::Expression {
            text: text.to_string(),
            error,
        })?;
        Ok(Weight::Expression(Arc::new(expr)))
    }

    pub fn expression(expr: impl WeightExpression + 'static) -> Self {
        Weight::Expression(Arc::new(expr))
    }

    pub fn uses_expression(&self) -> bool {
        matches!(self, Weight::Expression(_))
    }

    pub fn value_for(&self, cand: &Candidate) -> Result<f64, ExprError> {
        match self {
            Weight::Constant(w) => Ok(*w),
            Weight::Expression(expr) => expr.evaluate(cand),
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Constant(w) => write!(f, "{w}"),
            Weight::Expression(expr) => write!(f, "{}", expr.text()),
        }
    }
}
