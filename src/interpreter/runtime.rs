use std::rc::Rc;

use crate::ast::{BinaryOperator, Expression, LogicalOperator, Statement, VariablePath};
use crate::runtime::class::Instance;
use crate::runtime::comparators::{self, CallContext};
use crate::runtime::error::RuntimeError;
use crate::runtime::value::{Closure, Value};

/// Statement-level control-flow marker.
///
/// A return signal travels through enclosing blocks untouched until the
/// method-call boundary converts it into the call's result.
pub(super) enum ExecResult {
    Continue,
    Return(Value),
}

/// Runtime executor for statements and expressions.
pub(super) struct InterpreterRuntime {
    pub(super) output: String,
}

impl InterpreterRuntime {
    pub(super) fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub(super) fn exec_block(
        &mut self,
        body: &[Statement],
        closure: &mut Closure,
    ) -> Result<ExecResult, RuntimeError> {
        for statement in body {
            if let ExecResult::Return(value) = self.exec_statement(statement, closure)? {
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(
        &mut self,
        statement: &Statement,
        closure: &mut Closure,
    ) -> Result<ExecResult, RuntimeError> {
        match statement {
            Statement::Assign { name, value } => {
                let value = self.eval_expression(value, closure)?;
                closure.insert(name.clone(), value);
                Ok(ExecResult::Continue)
            }
            Statement::FieldAssign {
                object,
                field,
                value,
            } => {
                let target = self.eval_variable(object, closure)?;
                if !target.is_instance() {
                    return Err(RuntimeError::FieldAssignOnNonInstance {
                        field: field.clone(),
                    });
                }
                let value = self.eval_expression(value, closure)?;
                target.set_instance_field(field, value);
                Ok(ExecResult::Continue)
            }
            Statement::Print(args) => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    let value = self.eval_expression(arg, closure)?;
                    rendered.push(self.render(&value)?);
                }
                self.output.push_str(&rendered.join(" "));
                self.output.push('\n');
                Ok(ExecResult::Continue)
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.eval_expression(condition, closure)?;
                let body = if condition.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                self.exec_block(body, closure)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expression(expr, closure)?,
                    None => Value::none_object(),
                };
                Ok(ExecResult::Return(value))
            }
            Statement::ClassDef(class) => {
                closure.insert(
                    class.name().to_string(),
                    Value::class_object(Rc::clone(class)),
                );
                Ok(ExecResult::Continue)
            }
            Statement::Expr(expr) => {
                self.eval_expression(expr, closure)?;
                Ok(ExecResult::Continue)
            }
        }
    }

    fn eval_expression(
        &mut self,
        expr: &Expression,
        closure: &Closure,
    ) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Number(value) => Ok(Value::number_object(*value)),
            Expression::String(value) => Ok(Value::string_object(value.clone())),
            Expression::Boolean(value) => Ok(Value::bool_object(*value)),
            Expression::None => Ok(Value::none_object()),
            Expression::Variable(path) => self.eval_variable(path, closure),
            Expression::Stringify(inner) => {
                let value = self.eval_expression(inner, closure)?;
                let rendered = self.render(&value)?;
                Ok(Value::string_object(rendered))
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval_expression(left, closure)?;
                let right = self.eval_expression(right, closure)?;
                self.eval_binary(*op, left, right)
            }
            Expression::Comparison { left, op, right } => {
                let left = self.eval_expression(left, closure)?;
                let right = self.eval_expression(right, closure)?;
                let result = comparators::compare(self, *op, &left, &right)?;
                Ok(Value::bool_object(result))
            }
            Expression::LogicalOp { left, op, right } => {
                // Both operands are evaluated before the truth test; there is
                // no short-circuit.
                let left = self.eval_expression(left, closure)?;
                let right = self.eval_expression(right, closure)?;
                let result = match op {
                    LogicalOperator::And => left.is_truthy() && right.is_truthy(),
                    LogicalOperator::Or => left.is_truthy() || right.is_truthy(),
                };
                Ok(Value::bool_object(result))
            }
            Expression::Not(inner) => {
                let value = self.eval_expression(inner, closure)?;
                Ok(Value::bool_object(!value.is_truthy()))
            }
            Expression::MethodCall {
                object,
                method,
                args,
            } => {
                // Receiver first, then arguments left to right.
                let receiver = self.eval_expression(object, closure)?;
                if !receiver.is_instance() {
                    return Err(RuntimeError::MethodCallOnNonInstance {
                        method: method.clone(),
                    });
                }
                let mut actual_args = Vec::with_capacity(args.len());
                for arg in args {
                    actual_args.push(self.eval_expression(arg, closure)?);
                }
                self.call_method(&receiver, method, actual_args)
            }
            Expression::NewInstance { class, args } => {
                let instance = Value::instance_object(Instance::new(Rc::clone(class)));
                // Without __init__ anywhere on the chain the arguments stay
                // unevaluated.
                if class.method("__init__").is_some() {
                    let mut actual_args = Vec::with_capacity(args.len());
                    for arg in args {
                        actual_args.push(self.eval_expression(arg, closure)?);
                    }
                    self.call_method(&instance, "__init__", actual_args)?;
                }
                Ok(instance)
            }
        }
    }

    fn eval_variable(
        &self,
        path: &VariablePath,
        closure: &Closure,
    ) -> Result<Value, RuntimeError> {
        let Some((field, intermediates)) = path.rest.split_last() else {
            return lookup(closure, &path.first);
        };

        // Descend through every name but the last; each must resolve to a
        // class instance whose field scope hosts the next name.
        let mut owner = lookup(closure, &path.first)?;
        if !owner.is_instance() {
            return Err(RuntimeError::NotAnObject {
                name: path.first.clone(),
            });
        }
        for name in intermediates {
            let next = owner
                .instance_field(name)
                .ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() })?;
            if !next.is_instance() {
                return Err(RuntimeError::NotAnObject { name: name.clone() });
            }
            owner = next;
        }

        if cfg!(feature = "root-name-lookup") {
            // Alternate resolution: the final name is looked up in the scope
            // the chain started from (see DESIGN.md).
            lookup(closure, field)
        } else {
            owner
                .instance_field(field)
                .ok_or_else(|| RuntimeError::UndefinedVariable {
                    name: field.clone(),
                })
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOperator,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        if let (Some(l), Some(r)) = (left.try_number(), right.try_number()) {
            return match op {
                BinaryOperator::Add => Ok(Value::number_object(l + r)),
                BinaryOperator::Sub => Ok(Value::number_object(l - r)),
                BinaryOperator::Mul => Ok(Value::number_object(l * r)),
                BinaryOperator::Div => {
                    if r == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        Ok(Value::number_object(l / r))
                    }
                }
            };
        }
        if op == BinaryOperator::Add {
            if let (Some(l), Some(r)) = (left.try_string(), right.try_string()) {
                return Ok(Value::string_object(l + &r));
            }
            if left.has_method("__add__", 1) {
                return self.call_method(&left, "__add__", vec![right]);
            }
        }
        Err(RuntimeError::UnsupportedOperands {
            operation: op.symbol(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        })
    }

    /// Invoke `method` on `receiver` through the inheritance chain.
    ///
    /// The call scope shares the receiver through `self`, so field writes in
    /// the body are visible through every other handle to the instance. A
    /// normally completing body yields `None`; a return signal fired inside
    /// it is converted into the call's result here and nowhere else.
    pub(super) fn call_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let class = receiver
            .instance_class()
            .ok_or_else(|| RuntimeError::MethodCallOnNonInstance {
                method: method.to_string(),
            })?;
        let resolved = class
            .method(method)
            .ok_or_else(|| RuntimeError::UnknownMethod {
                class: class.name().to_string(),
                method: method.to_string(),
            })?;
        if resolved.formal_params.len() != args.len() {
            return Err(RuntimeError::MethodArityMismatch {
                class: class.name().to_string(),
                method: method.to_string(),
                expected: resolved.formal_params.len(),
                found: args.len(),
            });
        }

        let mut scope = Closure::new();
        scope.insert("self".to_string(), receiver.clone());
        for (param, value) in resolved.formal_params.iter().zip(args) {
            scope.insert(param.clone(), value);
        }
        match self.exec_block(&resolved.body, &mut scope)? {
            ExecResult::Continue => Ok(Value::none_object()),
            ExecResult::Return(value) => Ok(value),
        }
    }

    /// Render a value through its print contract: a `None` handle prints the
    /// literal, instances dispatch to a zero-argument `__str__` when one is
    /// defined.
    pub(super) fn render(&mut self, value: &Value) -> Result<String, RuntimeError> {
        if value.has_method("__str__", 0) {
            let rendered = self.call_method(value, "__str__", Vec::new())?;
            return self.render(&rendered);
        }
        Ok(value.to_output())
    }
}

impl CallContext for InterpreterRuntime {
    fn call_magic_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.call_method(receiver, method, args)
    }
}

fn lookup(closure: &Closure, name: &str) -> Result<Value, RuntimeError> {
    closure
        .get(name)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedVariable {
            name: name.to_string(),
        })
}
