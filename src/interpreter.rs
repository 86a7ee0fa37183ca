//! Tree-walking evaluator.
//!
//! Statements execute directly against a scope. The only non-local control
//! flow is the return signal, which `InterpreterRuntime::call_method`
//! converts into the call's result; everything else unwinds as an error.

use crate::ast::Program;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Closure;

mod runtime;

use runtime::{ExecResult, InterpreterRuntime};

pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Execute `program` with fresh globals, returning everything it printed.
    pub fn run(&self, program: &Program) -> Result<String, RuntimeError> {
        let mut globals = Closure::new();
        let mut runtime = InterpreterRuntime::new();
        match runtime.exec_block(&program.statements, &mut globals)? {
            ExecResult::Continue => Ok(runtime.output),
            ExecResult::Return(_) => Err(RuntimeError::ReturnOutsideMethod),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use indoc::indoc;

    fn run(source: &str) -> Result<String, RuntimeError> {
        let program = parser::parse_source(source).expect("program should parse");
        Interpreter::new().run(&program)
    }

    fn run_ok(source: &str) -> String {
        run(source).expect("program should run")
    }

    #[test]
    fn prints_arithmetic_results() {
        assert_eq!(run_ok("print 1 + 2\n"), "3\n");
        assert_eq!(run_ok("print 2 + 3 * 4\n"), "14\n");
        assert_eq!(run_ok("print 7 * 3 - 7 * 3 + 7\n"), "7\n");
    }

    #[test]
    fn concatenates_strings() {
        assert_eq!(run_ok("x = 'he'\nprint x + 'llo'\n"), "hello\n");
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(run_ok("print 7 / 2\n"), "3\n");
        assert_eq!(run_ok("print 0 - 7 / 2\n"), "-3\n");
        assert_eq!(run_ok("print -7 / 2\n"), "-3\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let err = run("x = 5\nprint x / 0\n").expect_err("expected division failure");
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn if_else_follows_truthiness() {
        let source = indoc! {"
            if 0:
              print 'a'
            else:
              print 'b'
        "};
        assert_eq!(run_ok(source), "b\n");
        assert_eq!(run_ok("if 'nonempty':\n  print 'yes'\n"), "yes\n");
        assert_eq!(run_ok("if '':\n  print 'yes'\nelse:\n  print 'no'\n"), "no\n");
    }

    #[test]
    fn print_separates_args_and_renders_none() {
        assert_eq!(run_ok("print 1, 'two', True, None\n"), "1 two True None\n");
        assert_eq!(run_ok("print\n"), "\n");
    }

    #[test]
    fn instances_print_through_str_dunder() {
        let source = indoc! {"
            class Point:
              def __init__(self, x, y):
                self.x = x
                self.y = y
              def __str__(self):
                return str(self.x) + ',' + str(self.y)
            p = Point(3, 4)
            print p
        "};
        assert_eq!(run_ok(source), "3,4\n");
    }

    #[test]
    fn instances_without_str_print_an_identity_token() {
        let source = indoc! {"
            class Opaque:
              def touch(self):
                return None
            print Opaque()
        "};
        let output = run_ok(source);
        assert!(output.starts_with("<Opaque object at 0x"));
        assert!(output.ends_with(">\n"));
    }

    #[test]
    fn stringify_matches_print_rendering() {
        assert_eq!(run_ok("print str(12) + '!'\n"), "12!\n");
        assert_eq!(run_ok("print str(None), str(True)\n"), "None True\n");
        let source = indoc! {"
            class Point:
              def __init__(self, x, y):
                self.x = x
                self.y = y
              def __str__(self):
                return str(self.x) + ',' + str(self.y)
            p = Point(3, 4)
            print str(p)
            print p
        "};
        assert_eq!(run_ok(source), "3,4\n3,4\n");
    }

    #[test]
    fn derived_methods_override_base_methods() {
        let source = indoc! {"
            class A:
              def greet(self):
                print 'hello from A'
              def name(self):
                return 'A'
            class B(A):
              def greet(self):
                print 'hello from B'
            B().greet()
            print B().name()
        "};
        assert_eq!(run_ok(source), "hello from B\nA\n");
    }

    #[test]
    fn field_writes_through_self_are_visible_to_the_caller() {
        let source = indoc! {"
            class Counter:
              def __init__(self):
                self.count = 0
              def bump(self):
                self.count = self.count + 1
            c = Counter()
            c.bump()
            c.bump()
            print c.count
        "};
        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn add_dunder_handles_instance_addition() {
        let source = indoc! {"
            class Vec:
              def __init__(self, x):
                self.x = x
              def __add__(self, other):
                return Vec(self.x + other.x)
              def __str__(self):
                return str(self.x)
            print Vec(1) + Vec(2)
        "};
        assert_eq!(run_ok(source), "3\n");
    }

    #[test]
    fn return_unwinds_nested_blocks_only_to_the_call_boundary() {
        let source = indoc! {"
            class Chooser:
              def pick(self, flag):
                if flag:
                  if True:
                    return 'yes'
                  print 'unreachable'
                return 'no'
            t = Chooser()
            print t.pick(True), t.pick(False)
        "};
        assert_eq!(run_ok(source), "yes no\n");
    }

    #[test]
    fn method_without_return_yields_none() {
        let source = indoc! {"
            class Quiet:
              def nothing(self):
                x = 1
            q = Quiet()
            print q.nothing()
        "};
        assert_eq!(run_ok(source), "None\n");
    }

    #[test]
    fn return_at_top_level_is_a_runtime_error() {
        let err = run("return 1\n").expect_err("expected stray return failure");
        assert_eq!(err, RuntimeError::ReturnOutsideMethod);
    }

    #[test]
    fn logical_operators_evaluate_both_operands() {
        let source = indoc! {"
            class Probe:
              def note(self):
                print 'evaluated'
                return True
            p = Probe()
            if True or p.note():
              print 'done'
        "};
        // No short-circuit: the right operand runs even though the left
        // already decides the result.
        assert_eq!(run_ok(source), "evaluated\ndone\n");
        assert_eq!(run_ok("print 1 and 0, 0 or 'x', not 0\n"), "False True True\n");
    }

    #[test]
    fn comparisons_cover_primitives_and_derived_operators() {
        assert_eq!(run_ok("print 1 < 2, 2 < 1, 1 == 1, 1 != 1\n"), "True False True False\n");
        assert_eq!(run_ok("print 'a' < 'b', 'a' == 'a'\n"), "True True\n");
        assert_eq!(run_ok("print 2 <= 2, 2 >= 3, 3 > 2\n"), "True False True\n");
        assert_eq!(run_ok("x = None\nprint x == None\n"), "True\n");
    }

    #[test]
    fn comparison_dunders_drive_instance_comparisons() {
        let source = indoc! {"
            class Pair:
              def __init__(self, a):
                self.a = a
              def __eq__(self, other):
                return self.a == other.a
              def __lt__(self, other):
                return self.a < other.a
            x = Pair(1)
            y = Pair(2)
            print x == y, x < y, x != y, x >= y
        "};
        assert_eq!(run_ok(source), "False True True False\n");
    }

    #[test]
    fn instances_are_truthy() {
        let source = indoc! {"
            class Empty:
              def noop(self):
                return None
            if Empty():
              print 'truthy'
        "};
        assert_eq!(run_ok(source), "truthy\n");
    }

    #[test]
    fn constructor_arity_errors_propagate() {
        let source = indoc! {"
            class Point:
              def __init__(self, x, y):
                self.x = x
            p = Point(3)
        "};
        let err = run(source).expect_err("expected arity failure");
        assert_eq!(
            err,
            RuntimeError::MethodArityMismatch {
                class: "Point".to_string(),
                method: "__init__".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn classes_without_init_ignore_constructor_arguments() {
        let source = indoc! {"
            class Bare:
              def ping(self):
                return 'pong'
            b = Bare(undefined_name)
            print b.ping()
        "};
        // The argument expression is never evaluated, so the undefined name
        // does not surface.
        assert_eq!(run_ok(source), "pong\n");
    }

    #[test]
    fn unknown_method_calls_fail_with_the_class_name() {
        let source = indoc! {"
            class A:
              def m(self):
                return 1
            a = A()
            a.missing()
        "};
        let err = run(source).expect_err("expected unknown method failure");
        assert_eq!(
            err,
            RuntimeError::UnknownMethod {
                class: "A".to_string(),
                method: "missing".to_string(),
            }
        );
    }

    #[test]
    fn method_calls_on_non_instances_fail() {
        let err = run("x = 5\nx.m()\n").expect_err("expected non-instance failure");
        assert_eq!(
            err,
            RuntimeError::MethodCallOnNonInstance {
                method: "m".to_string(),
            }
        );
    }

    #[test]
    fn mixed_operand_arithmetic_fails() {
        let err = run("print 1 + 'a'\n").expect_err("expected unsupported operands failure");
        assert_eq!(
            err,
            RuntimeError::UnsupportedOperands {
                operation: '+',
                left: "number".to_string(),
                right: "string".to_string(),
            }
        );
        assert!(run("print 'a' - 'b'\n").is_err());
        assert!(run("print 'a' * 2\n").is_err());
    }

    #[test]
    fn undefined_names_fail_lookup() {
        let err = run("print missing\n").expect_err("expected undefined variable failure");
        assert_eq!(
            err,
            RuntimeError::UndefinedVariable {
                name: "missing".to_string(),
            }
        );
    }

    #[test]
    fn dotted_access_through_a_non_instance_fails() {
        let err = run("x = 5\nprint x.field\n").expect_err("expected non-object failure");
        assert_eq!(
            err,
            RuntimeError::NotAnObject {
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn field_reads_chain_through_nested_instances() {
        let source = indoc! {"
            class Inner:
              def __init__(self, value):
                self.value = value
            class Outer:
              def __init__(self, inner):
                self.inner = inner
            o = Outer(Inner(42))
            print o.inner.value
        "};
        assert_eq!(run_ok(source), "42\n");
    }

    #[test]
    fn globals_do_not_leak_between_runs() {
        let interpreter = Interpreter::new();
        let first = parser::parse_source("x = 1\nprint x\n").expect("program should parse");
        assert_eq!(interpreter.run(&first).expect("first run"), "1\n");

        let second = parser::parse_source("print x\n").expect("program should parse");
        let err = interpreter.run(&second).expect_err("expected fresh globals");
        assert_eq!(
            err,
            RuntimeError::UndefinedVariable {
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn not_negates_truthiness_for_every_kind() {
        assert_eq!(
            run_ok("print not 0, not 1, not '', not 'x', not True, not None\n"),
            "True False True False False True\n"
        );
    }

    #[test]
    fn method_arguments_bind_positionally() {
        let source = indoc! {"
            class Calc:
              def sub(self, a, b):
                return a - b
            print Calc().sub(10, 4)
        "};
        assert_eq!(run_ok(source), "6\n");
    }
}
