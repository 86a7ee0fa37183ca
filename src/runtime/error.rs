use thiserror::Error;

/// Typed errors produced by the runtime and the evaluator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Variable '{name}' not found in scope")]
    UndefinedVariable { name: String },
    #[error("'{name}' is not an object, can't access its fields")]
    NotAnObject { name: String },
    #[error("Class {class} doesn't have method {method}")]
    UnknownMethod { class: String, method: String },
    #[error("Method {class}::{method} expects {expected} arguments, but {found} given")]
    MethodArityMismatch {
        class: String,
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("Trying to call method '{method}' on a value that is not a class instance")]
    MethodCallOnNonInstance { method: String },
    #[error("Cannot assign to field '{field}' of a value that is not a class instance")]
    FieldAssignOnNonInstance { field: String },
    #[error("Operation '{operation}' is not supported for {left} and {right}")]
    UnsupportedOperands {
        operation: char,
        left: String,
        right: String,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot compare {left} and {right} for {operation}")]
    Incomparable {
        operation: String,
        left: String,
        right: String,
    },
    #[error("Class {class} has duplicate method '{method}'")]
    DuplicateMethod { class: String, method: String },
    #[error("Return outside of a method body")]
    ReturnOutsideMethod,
}
