//! Sandboxed expression evaluation for derived attributes, account links
//! and templates.

use rhai::{Dynamic, Engine, Scope};
use std::collections::BTreeMap;
use tracing::warn;

/// Maximum number of operations before termination.
const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

/// Maximum call stack depth.
const DEFAULT_MAX_CALL_STACK_DEPTH: usize = 64;

/// Maximum string size in bytes.
const DEFAULT_MAX_STRING_SIZE: usize = 65536;

/// Maximum array size.
const DEFAULT_MAX_ARRAY_SIZE: usize = 10_000;

/// Maximum map size.
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Configuration for the expression evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub max_operations: u64,
    pub max_call_stack_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_stack_depth: DEFAULT_MAX_CALL_STACK_DEPTH,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
        }
    }
}

/// Evaluates attribute expressions in a sandboxed engine.
///
/// A fresh engine is created per evaluation so no state leaks between
/// expressions. Evaluation never fails the caller: any compile or runtime
/// error logs a warning and yields the empty string, which callers treat
/// as "no value".
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    config: EvaluatorConfig,
}

impl ExpressionEvaluator {
    /// Create an evaluator with default sandbox limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluator with custom sandbox limits.
    #[must_use]
    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Evaluate an expression against a string-valued context.
    ///
    /// Each context entry becomes a scope constant, its name sanitized to
    /// a valid identifier. The result is rendered as a string; unit
    /// results and failures render as `""`.
    #[must_use]
    pub fn evaluate(&self, expression: &str, context: &BTreeMap<String, String>) -> String {
        if expression.trim().is_empty() {
            return String::new();
        }

        let engine = self.create_engine();
        let mut scope = Scope::new();
        for (name, value) in context {
            scope.push_constant(sanitize_identifier(name), value.clone());
        }

        match engine.eval_with_scope::<Dynamic>(&mut scope, expression) {
            Ok(result) if result.is_unit() => String::new(),
            Ok(result) => result.to_string(),
            Err(e) => {
                warn!(expression = %expression, error = %e, "expression evaluation failed");
                String::new()
            }
        }
    }

    fn create_engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.config.max_operations);
        engine.set_max_call_levels(self.config.max_call_stack_depth);
        engine.set_max_string_size(self.config.max_string_size);
        engine.set_max_array_size(self.config.max_array_size);
        engine.set_max_map_size(self.config.max_map_size);
        engine
    }
}

/// Replace characters that cannot appear in an identifier; a leading
/// digit gets an underscore prefix.
fn sanitize_identifier(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_concatenation() {
        let evaluator = ExpressionEvaluator::new();
        let result = evaluator.evaluate(
            r#"firstname + "." + surname"#,
            &ctx(&[("firstname", "john"), ("surname", "doe")]),
        );
        assert_eq!(result, "john.doe");
    }

    #[test]
    fn test_failure_yields_empty_string() {
        let evaluator = ExpressionEvaluator::new();
        assert_eq!(evaluator.evaluate("let x = ;", &ctx(&[])), "");
        assert_eq!(evaluator.evaluate("undefined_variable", &ctx(&[])), "");
        assert_eq!(evaluator.evaluate("", &ctx(&[])), "");
    }

    #[test]
    fn test_unit_result_is_empty() {
        let evaluator = ExpressionEvaluator::new();
        assert_eq!(evaluator.evaluate("let x = 1;", &ctx(&[])), "");
    }

    #[test]
    fn test_sanitized_context_names() {
        let evaluator = ExpressionEvaluator::new();
        let result = evaluator.evaluate("cost_center", &ctx(&[("cost-center", "CC-100")]));
        assert_eq!(result, "CC-100");
    }

    #[test]
    fn test_runaway_expression_is_bounded() {
        let evaluator = ExpressionEvaluator::with_config(EvaluatorConfig {
            max_operations: 100,
            ..EvaluatorConfig::default()
        });
        let result = evaluator.evaluate(
            "let x = 0; while x < 1000000 { x += 1; }; x",
            &ctx(&[]),
        );
        assert_eq!(result, "");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("plain"), "plain");
        assert_eq!(sanitize_identifier("cost-center"), "cost_center");
        assert_eq!(sanitize_identifier("1st"), "_1st");
    }
}
