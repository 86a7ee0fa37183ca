//! Cross-type equality and ordering.
//!
//! `equal` and `less` probe the primitive pairings first, then fall back to
//! the left operand's comparison dunder; the derived comparators are defined
//! by composition on top of the two.

use crate::ast::ComparisonOp;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;

/// Evaluation hook for comparison dunder methods on class instances.
pub(crate) trait CallContext {
    fn call_magic_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

fn try_primitive(
    lhs: &Value,
    rhs: &Value,
    numbers: impl Fn(i64, i64) -> bool,
    strings: impl Fn(&str, &str) -> bool,
    bools: impl Fn(bool, bool) -> bool,
) -> Option<bool> {
    if let (Some(l), Some(r)) = (lhs.try_number(), rhs.try_number()) {
        return Some(numbers(l, r));
    }
    if let (Some(l), Some(r)) = (lhs.try_string(), rhs.try_string()) {
        return Some(strings(&l, &r));
    }
    if let (Some(l), Some(r)) = (lhs.try_bool(), rhs.try_bool()) {
        return Some(bools(l, r));
    }
    None
}

pub(crate) fn equal(
    context: &mut dyn CallContext,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, RuntimeError> {
    if let Some(result) = try_primitive(lhs, rhs, |l, r| l == r, |l, r| l == r, |l, r| l == r) {
        return Ok(result);
    }
    if lhs.has_method("__eq__", 1) {
        let verdict = context.call_magic_method(lhs, "__eq__", vec![rhs.clone()])?;
        return Ok(verdict.is_truthy());
    }
    if lhs.is_none() && rhs.is_none() {
        return Ok(true);
    }
    Err(incomparable("equality", lhs, rhs))
}

pub(crate) fn less(
    context: &mut dyn CallContext,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, RuntimeError> {
    if let Some(result) = try_primitive(lhs, rhs, |l, r| l < r, |l, r| l < r, |l, r| l < r) {
        return Ok(result);
    }
    if lhs.has_method("__lt__", 1) {
        let verdict = context.call_magic_method(lhs, "__lt__", vec![rhs.clone()])?;
        return Ok(verdict.is_truthy());
    }
    Err(incomparable("less", lhs, rhs))
}

/// Dispatch a comparison operator; everything beyond `==` and `<` is
/// composed from the two base comparators.
pub(crate) fn compare(
    context: &mut dyn CallContext,
    op: ComparisonOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, RuntimeError> {
    match op {
        ComparisonOp::Eq => equal(context, lhs, rhs),
        ComparisonOp::NotEq => Ok(!equal(context, lhs, rhs)?),
        ComparisonOp::Less => less(context, lhs, rhs),
        ComparisonOp::LessEq => Ok(less(context, lhs, rhs)? || equal(context, lhs, rhs)?),
        ComparisonOp::Greater => Ok(!less(context, lhs, rhs)? && !equal(context, lhs, rhs)?),
        ComparisonOp::GreaterEq => Ok(!less(context, lhs, rhs)?),
    }
}

fn incomparable(operation: &str, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::Incomparable {
        operation: operation.to_string(),
        left: lhs.type_name().to_string(),
        right: rhs.type_name().to_string(),
    }
}
