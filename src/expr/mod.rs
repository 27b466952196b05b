// ============================================================================
// spark-bind - Expressions
// The restricted script language used inside binding markers
// ============================================================================
//
// Expressions are parsed once and interpreted against a `Scope`. The binder
// talks to them only through the `Evaluate` trait, so a host can plug in a
// different evaluator.
// ============================================================================

pub mod ast;
pub mod builtins;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::EvaluationError;
use crate::primitives::scope::Scope;
use ast::Expr;

pub use parser::parse;
pub use value::{to_display, truthy};

// =============================================================================
// EVALUATE TRAIT
// =============================================================================

/// Evaluates binding expressions against a scope.
pub trait Evaluate {
    /// Evaluate `expression` and return its value.
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, EvaluationError>;

    /// Write `value` to the place `target` names (`name`, `a.b`, `a[i]`).
    fn assign(&self, target: &str, value: Value, scope: &Scope) -> Result<(), EvaluationError>;
}

// =============================================================================
// DEFAULT EVALUATOR
// =============================================================================

/// The built-in evaluator. Parsed expressions are cached by source text.
#[derive(Default)]
pub struct Evaluator {
    cache: RefCell<HashMap<String, Rc<Expr>>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `expression`, reusing a cached AST when there is one.
    pub fn compile(&self, expression: &str) -> Result<Rc<Expr>, EvaluationError> {
        if let Some(expr) = self.cache.borrow().get(expression) {
            return Ok(expr.clone());
        }

        let expr = Rc::new(parse(expression)?);
        self.cache
            .borrow_mut()
            .insert(expression.to_string(), expr.clone());
        Ok(expr)
    }

    /// Number of distinct expressions parsed so far.
    pub fn cached_count(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl Evaluate for Evaluator {
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, EvaluationError> {
        let expr = self.compile(expression)?;
        eval::eval(&expr, scope)
    }

    fn assign(&self, target: &str, value: Value, scope: &Scope) -> Result<(), EvaluationError> {
        let expr = self.compile(target)?;
        if !expr.is_assignable() {
            return Err(EvaluationError::NotAssignable(target.trim().to_string()));
        }
        eval::assign(&expr, value, scope)
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("cached", &self.cached_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
