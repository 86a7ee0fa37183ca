use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{bail, Context, Result};

use crate::ast::{
    BinaryOperator, ComparisonOp, Expression, LogicalOperator, Program, Statement, VariablePath,
};
use crate::lexer::Lexer;
use crate::runtime::class::{Class, Method};
use crate::token::Token;

/// Recursive-descent parser over the lexer's token stream.
///
/// Classes are resolved while parsing: a definition registers the class, and
/// a later `Name(args)` call produces a `NewInstance` node referencing it.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    classes: HashMap<String, Rc<Class>>,
}

/// Lex and parse a complete program.
pub fn parse_source(source: &str) -> Result<Program> {
    let lexer = Lexer::new(source)?;
    Parser::new(lexer).parse_program()
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Program> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines()?;
            if matches!(self.current(), Token::Eof) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        if matches!(self.current(), Token::Class) {
            return self.parse_class();
        }
        if matches!(self.current(), Token::If) {
            return self.parse_if();
        }
        if matches!(self.current(), Token::Return) {
            return self.parse_return();
        }
        if matches!(self.current(), Token::Print) {
            return self.parse_print();
        }
        self.parse_assignment_or_expression()
    }

    fn parse_class(&mut self) -> Result<Statement> {
        self.advance()?; // class
        let name = self.expect_id()?;

        let parent = if matches!(self.current(), Token::Char('(')) {
            self.advance()?;
            let parent_name = self.expect_id()?;
            self.expect_token(Token::Char(')'))?;
            let parent = self.classes.get(&parent_name).cloned().with_context(|| {
                format!("Unknown base class '{parent_name}' at line {}", self.line())
            })?;
            Some(parent)
        } else {
            None
        };

        self.expect_token(Token::Char(':'))?;
        self.expect_token(Token::Newline)?;
        self.expect_token(Token::Indent)?;
        let mut methods = Vec::new();
        loop {
            self.skip_newlines()?;
            if matches!(self.current(), Token::Dedent | Token::Eof) {
                break;
            }
            methods.push(self.parse_method()?);
        }
        self.expect_token(Token::Dedent)?;

        let class = Class::new(name.clone(), methods, parent)
            .with_context(|| format!("Defining class '{name}'"))?;
        let class = Rc::new(class);
        self.classes.insert(name, Rc::clone(&class));
        Ok(Statement::ClassDef(class))
    }

    fn parse_method(&mut self) -> Result<Method> {
        self.expect_token(Token::Def)?;
        let name = self.expect_id()?;
        self.expect_token(Token::Char('('))?;

        // The receiver is spelled out in source but not stored: the runtime
        // binds `self` on every call, so declared arity equals the number of
        // arguments a call site passes.
        let receiver = self.expect_id()?;
        if receiver != "self" {
            bail!(
                "First parameter of method '{name}' must be 'self', got '{receiver}' at line {}",
                self.line()
            );
        }
        let mut formal_params = Vec::new();
        while matches!(self.current(), Token::Char(',')) {
            self.advance()?;
            formal_params.push(self.expect_id()?);
        }
        self.expect_token(Token::Char(')'))?;

        let body = self.parse_suite()?;
        Ok(Method {
            name,
            formal_params,
            body,
        })
    }

    fn parse_if(&mut self) -> Result<Statement> {
        self.advance()?; // if
        let condition = self.parse_expression()?;
        let then_body = self.parse_suite()?;
        let else_body = if matches!(self.current(), Token::Else) {
            self.advance()?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_print(&mut self) -> Result<Statement> {
        self.advance()?; // print
        let mut args = Vec::new();
        if !matches!(self.current(), Token::Newline) {
            args.push(self.parse_expression()?);
            while matches!(self.current(), Token::Char(',')) {
                self.advance()?;
                args.push(self.parse_expression()?);
            }
        }
        self.expect_token(Token::Newline)?;
        Ok(Statement::Print(args))
    }

    fn parse_return(&mut self) -> Result<Statement> {
        self.advance()?; // return
        if matches!(self.current(), Token::Newline) {
            self.advance()?;
            return Ok(Statement::Return(None));
        }
        let value = self.parse_expression()?;
        self.expect_token(Token::Newline)?;
        Ok(Statement::Return(Some(value)))
    }

    fn parse_assignment_or_expression(&mut self) -> Result<Statement> {
        let line = self.line();
        let expr = self.parse_expression()?;

        if matches!(self.current(), Token::Char('=')) {
            self.advance()?;
            let value = self.parse_expression()?;
            self.expect_token(Token::Newline)?;
            let Expression::Variable(mut path) = expr else {
                bail!("Invalid assignment target at line {line}");
            };
            return Ok(match path.rest.pop() {
                Some(field) => Statement::FieldAssign {
                    object: path,
                    field,
                    value,
                },
                None => Statement::Assign {
                    name: path.first,
                    value,
                },
            });
        }

        self.expect_token(Token::Newline)?;
        Ok(Statement::Expr(expr))
    }

    /// Parse `: NEWLINE INDENT statement+ DEDENT`.
    fn parse_suite(&mut self) -> Result<Vec<Statement>> {
        self.expect_token(Token::Char(':'))?;
        self.expect_token(Token::Newline)?;
        self.expect_token(Token::Indent)?;
        let mut body = Vec::new();
        loop {
            self.skip_newlines()?;
            if matches!(self.current(), Token::Dedent | Token::Eof) {
                break;
            }
            body.push(self.parse_statement()?);
        }
        self.expect_token(Token::Dedent)?;
        Ok(body)
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut expr = self.parse_and()?;
        while matches!(self.current(), Token::Or) {
            self.advance()?;
            let right = self.parse_and()?;
            expr = Expression::LogicalOp {
                left: Box::new(expr),
                op: LogicalOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut expr = self.parse_not()?;
        while matches!(self.current(), Token::And) {
            self.advance()?;
            let right = self.parse_not()?;
            expr = Expression::LogicalOp {
                left: Box::new(expr),
                op: LogicalOperator::And,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if matches!(self.current(), Token::Not) {
            self.advance()?;
            return Ok(Expression::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let expr = self.parse_additive()?;
        let op = match self.current() {
            Token::Eq => ComparisonOp::Eq,
            Token::NotEq => ComparisonOp::NotEq,
            Token::LessOrEq => ComparisonOp::LessEq,
            Token::GreaterOrEq => ComparisonOp::GreaterEq,
            Token::Char('<') => ComparisonOp::Less,
            Token::Char('>') => ComparisonOp::Greater,
            _ => return Ok(expr),
        };
        self.advance()?;
        let right = self.parse_additive()?;
        Ok(Expression::Comparison {
            left: Box::new(expr),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Char('+') => BinaryOperator::Add,
                Token::Char('-') => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_term()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Char('*') => BinaryOperator::Mul,
                Token::Char('/') => BinaryOperator::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if matches!(self.current(), Token::Char('-')) {
            self.advance()?;
            // Negation is syntactic; the lexer only produces unsigned
            // numbers.
            let operand = self.parse_unary()?;
            return Ok(Expression::BinaryOp {
                left: Box::new(Expression::Number(0)),
                op: BinaryOperator::Sub,
                right: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        while matches!(self.current(), Token::Char('.')) {
            self.advance()?;
            let method = self.expect_id()?;
            self.expect_token(Token::Char('('))?;
            let args = self.parse_call_args()?;
            expr = Expression::MethodCall {
                object: Box::new(expr),
                method,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        match self.current().clone() {
            Token::Number(value) => {
                self.advance()?;
                Ok(Expression::Number(value))
            }
            Token::String(value) => {
                self.advance()?;
                Ok(Expression::String(value))
            }
            Token::True => {
                self.advance()?;
                Ok(Expression::Boolean(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expression::Boolean(false))
            }
            Token::None => {
                self.advance()?;
                Ok(Expression::None)
            }
            Token::Char('(') => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect_token(Token::Char(')'))?;
                Ok(expr)
            }
            Token::Id(name) => self.parse_name_expression(name),
            other => bail!("Expected expression, got {other} at line {}", self.line()),
        }
    }

    /// Identifier-led primary: `str(expr)`, a dotted variable chain, a
    /// constructor call, or a method call on a chain.
    fn parse_name_expression(&mut self, first: String) -> Result<Expression> {
        self.advance()?;

        if first == "str" && matches!(self.current(), Token::Char('(')) {
            self.advance()?;
            let inner = self.parse_expression()?;
            self.expect_token(Token::Char(')'))?;
            return Ok(Expression::Stringify(Box::new(inner)));
        }

        let mut rest = Vec::new();
        while matches!(self.current(), Token::Char('.')) {
            self.advance()?;
            rest.push(self.expect_id()?);
        }

        if matches!(self.current(), Token::Char('(')) {
            self.advance()?;
            let args = self.parse_call_args()?;
            return match rest.pop() {
                Some(method) => Ok(Expression::MethodCall {
                    object: Box::new(Expression::Variable(VariablePath::dotted(first, rest))),
                    method,
                    args,
                }),
                None => {
                    let class = self.classes.get(&first).cloned().with_context(|| {
                        format!("Unknown class '{first}' at line {}", self.line())
                    })?;
                    Ok(Expression::NewInstance { class, args })
                }
            };
        }

        Ok(Expression::Variable(VariablePath::dotted(first, rest)))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expression>> {
        let mut args = Vec::new();
        if !matches!(self.current(), Token::Char(')')) {
            args.push(self.parse_expression()?);
            while matches!(self.current(), Token::Char(',')) {
                self.advance()?;
                args.push(self.parse_expression()?);
            }
        }
        self.expect_token(Token::Char(')'))?;
        Ok(args)
    }

    fn skip_newlines(&mut self) -> Result<()> {
        while matches!(self.current(), Token::Newline) {
            self.advance()?;
        }
        Ok(())
    }

    fn expect_id(&mut self) -> Result<String> {
        let name = self.lexer.expect_id()?.to_string();
        self.advance()?;
        Ok(name)
    }

    fn expect_token(&mut self, expected: Token) -> Result<()> {
        self.lexer.expect_token(&expected)?;
        self.advance()?;
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        self.lexer.next_token()?;
        Ok(())
    }

    fn current(&self) -> &Token {
        self.lexer.current_token()
    }

    fn line(&self) -> usize {
        self.lexer.current_line()
    }
}
