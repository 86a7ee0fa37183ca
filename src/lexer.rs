use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Odd number of leading spaces ({spaces}) at line {line}")]
    OddIndentation { spaces: usize, line: usize },
    #[error("Unterminated string literal at line {line}")]
    UnterminatedString { line: usize },
    #[error("Invalid number literal '{literal}' at line {line}")]
    InvalidNumber { literal: String, line: usize },
    #[error("Expected token {expected}, got {found} at line {line}")]
    UnexpectedToken {
        expected: String,
        found: Token,
        line: usize,
    },
}

pub type LexResult<T> = Result<T, LexError>;

/// Line-buffered character source tracking the current indentation level.
///
/// Blank and whitespace-only lines are skipped entirely; every retained line
/// must start with an even number of spaces (two per indent level). The end
/// of a line is surfaced as a synthetic `'\n'`; end of input as `None`. Once
/// the input is exhausted the indent level reads as zero so the lexer can
/// drain its pending dedents.
#[derive(Debug)]
pub struct IndentedReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
    line: &'a str,
    pos: usize,
    current_indent: usize,
    exhausted: bool,
}

impl<'a> IndentedReader<'a> {
    pub fn new(input: &'a str) -> LexResult<Self> {
        let mut reader = Self {
            lines: input.lines(),
            line_number: 0,
            line: "",
            pos: 0,
            current_indent: 0,
            exhausted: false,
        };
        reader.next_line()?;
        Ok(reader)
    }

    pub fn current_indent(&self) -> usize {
        self.current_indent
    }

    pub fn current_line_number(&self) -> usize {
        self.line_number
    }

    /// Advance to the next non-blank line, recomputing the indent level.
    pub fn next_line(&mut self) -> LexResult<()> {
        for line in self.lines.by_ref() {
            self.line_number += 1;
            let Some(start) = line.find(|c: char| !c.is_whitespace()) else {
                continue;
            };
            if start % 2 == 1 {
                return Err(LexError::OddIndentation {
                    spaces: start,
                    line: self.line_number,
                });
            }
            self.current_indent = start / 2;
            self.line = &line[start..];
            self.pos = 0;
            return Ok(());
        }
        self.exhausted = true;
        self.current_indent = 0;
        Ok(())
    }

    /// Next character of the current line, `'\n'` once the line is spent.
    pub fn get(&mut self) -> Option<char> {
        if self.exhausted {
            return None;
        }
        match self.line[self.pos..].chars().next() {
            Some(c) => {
                self.pos += c.len_utf8();
                Some(c)
            }
            None => Some('\n'),
        }
    }

    /// Like [`Self::get`], skipping intra-line whitespace.
    pub fn next(&mut self) -> Option<char> {
        if self.exhausted {
            return None;
        }
        while let Some(c) = self.line[self.pos..].chars().next() {
            self.pos += c.len_utf8();
            if !c.is_whitespace() {
                return Some(c);
            }
        }
        Some('\n')
    }
}

/// Streaming lexer with one token of lookahead.
pub struct Lexer<'a> {
    reader: IndentedReader<'a>,
    cur_char: Option<char>,
    indent: usize,
    current: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> LexResult<Self> {
        let mut reader = IndentedReader::new(input)?;
        let cur_char = reader.get();
        let mut lexer = Self {
            reader,
            cur_char,
            indent: 0,
            current: Token::Eof,
        };
        lexer.current = lexer.next_token_impl()?;
        Ok(lexer)
    }

    pub fn current_token(&self) -> &Token {
        &self.current
    }

    pub fn current_line(&self) -> usize {
        self.reader.current_line_number()
    }

    pub fn next_token(&mut self) -> LexResult<&Token> {
        self.current = self.next_token_impl()?;
        Ok(&self.current)
    }

    /// Fail unless the current token equals `expected`.
    pub fn expect_token(&self, expected: &Token) -> LexResult<()> {
        if &self.current == expected {
            Ok(())
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    /// Fail unless the current token is an identifier; yields its name.
    pub fn expect_id(&self) -> LexResult<&str> {
        match &self.current {
            Token::Id(name) => Ok(name),
            _ => Err(self.unexpected("Id".to_string())),
        }
    }

    /// Advance, then fail unless the new token equals `expected`.
    pub fn expect_next(&mut self, expected: Token) -> LexResult<()> {
        self.next_token()?;
        self.expect_token(&expected)
    }

    fn unexpected(&self, expected: String) -> LexError {
        LexError::UnexpectedToken {
            expected,
            found: self.current.clone(),
            line: self.current_line(),
        }
    }

    fn next_token_impl(&mut self) -> LexResult<Token> {
        // Indent reconciliation has priority over everything else; at most
        // one level is emitted per call.
        if self.indent > self.reader.current_indent() {
            self.indent -= 1;
            return Ok(Token::Dedent);
        }
        if self.indent < self.reader.current_indent() {
            self.indent += 1;
            return Ok(Token::Indent);
        }

        if self.cur_char == Some('\n') {
            self.reader.next_line()?;
            self.cur_char = self.reader.get();
            return Ok(Token::Newline);
        }

        if matches!(self.cur_char, Some(c) if c.is_whitespace()) {
            self.cur_char = self.reader.next();
        }

        let Some(c) = self.cur_char else {
            return Ok(Token::Eof);
        };

        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' || c == '\'' {
            return self.read_string(c);
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }
        if matches!(c, '=' | '!' | '<' | '>') {
            return Ok(self.read_operator(c));
        }

        self.cur_char = self.reader.next();
        Ok(Token::Char(c))
    }

    fn read_number(&mut self) -> LexResult<Token> {
        let mut literal = String::new();
        while let Some(c) = self.cur_char {
            if !c.is_ascii_digit() {
                break;
            }
            literal.push(c);
            self.cur_char = self.reader.get();
        }
        match literal.parse::<i64>() {
            Ok(value) => Ok(Token::Number(value)),
            Err(_) => Err(LexError::InvalidNumber {
                literal,
                line: self.reader.current_line_number(),
            }),
        }
    }

    fn read_string(&mut self, opener: char) -> LexResult<Token> {
        let mut value = String::new();
        let mut previous_backslash = false;
        loop {
            self.cur_char = self.reader.get();
            match self.cur_char {
                Some(c) if c == opener && !previous_backslash => break,
                Some('\n') | None => {
                    return Err(LexError::UnterminatedString {
                        line: self.reader.current_line_number(),
                    });
                }
                Some(c) => {
                    // Backslashes stay in the payload untranslated; one
                    // backslash shields the next character from closing
                    // the literal.
                    value.push(c);
                    previous_backslash = c == '\\';
                }
            }
        }
        self.cur_char = self.reader.next();
        Ok(Token::String(value))
    }

    fn read_identifier(&mut self) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.cur_char {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            lexeme.push(c);
            self.cur_char = self.reader.get();
        }
        match Token::keyword(&lexeme) {
            Some(token) => token,
            None => Token::Id(lexeme),
        }
    }

    fn read_operator(&mut self, first: char) -> Token {
        self.cur_char = self.reader.get();
        if self.cur_char == Some('=') {
            self.cur_char = self.reader.next();
            match first {
                '=' => Token::Eq,
                '!' => Token::NotEq,
                '<' => Token::LessOrEq,
                _ => Token::GreaterOrEq,
            }
        } else {
            Token::Char(first)
        }
    }
}

/// Collect the full token stream of `input`, ending with `Eof`.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input)?;
    let mut tokens = vec![lexer.current_token().clone()];
    while !matches!(tokens.last(), Some(Token::Eof)) {
        tokens.push(lexer.next_token()?.clone());
    }
    Ok(tokens)
}
