//! A small infix expression language for building graphs from text.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := factor (('*' | '/') factor)*
//! factor  := '-' factor | power
//! power   := primary ('^' factor)?
//! primary := number | ident | ident '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Numbers become constants, identifiers become variables (one node per name),
//! and calls are resolved through [`Op`]'s names, e.g. `sin(x)` or `pow(x, 3)`.
//! `^` is right associative and binds tighter than negation, so `-x^2` is
//! `-(x^2)`.

use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    op::Op,
    term::Term,
};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Sym(char),
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = vec![];
    let mut chars = src.char_indices().peekable();
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut end = pos;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '.' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &src[pos..end];
            let num = text.parse().map_err(|_| Error::Parse {
                pos,
                message: format!("invalid number {text:?}"),
            })?;
            tokens.push((pos, Token::Num(num)));
        } else if c.is_alphabetic() || c == '_' {
            let mut end = pos;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((pos, Token::Ident(src[pos..end].to_string())));
        } else if "+-*/^(),".contains(c) {
            tokens.push((pos, Token::Sym(c)));
            chars.next();
        } else {
            return Err(Error::Parse {
                pos,
                message: format!("unexpected character {c:?}"),
            });
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    end: usize,
    bindings: &'a HashMap<String, f64>,
    variables: HashMap<String, Term<f64>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, token)| token)
    }

    fn pos(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map_or(self.end, |(pos, _)| *pos)
    }

    fn error<R>(&self, message: impl Into<String>) -> Result<R> {
        Err(Error::Parse {
            pos: self.pos(),
            message: message.into(),
        })
    }

    fn eat(&mut self, sym: char) -> bool {
        if self.peek() == Some(&Token::Sym(sym)) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, sym: char) -> Result<()> {
        if self.eat(sym) {
            Ok(())
        } else {
            self.error(format!("expected {sym:?}"))
        }
    }

    fn expr(&mut self) -> Result<Term<f64>> {
        let mut lhs = self.term()?;
        loop {
            if self.eat('+') {
                lhs = &lhs + &self.term()?;
            } else if self.eat('-') {
                lhs = &lhs - &self.term()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Term<f64>> {
        let mut lhs = self.factor()?;
        loop {
            if self.eat('*') {
                lhs = &lhs * &self.factor()?;
            } else if self.eat('/') {
                lhs = &lhs / &self.factor()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn factor(&mut self) -> Result<Term<f64>> {
        if !self.eat('-') {
            return self.power();
        }
        // A negated literal is a single constant unless it is a base of `^`.
        if let Some(Token::Num(num)) = self.peek() {
            let num = *num;
            let next = self.tokens.get(self.cursor + 1).map(|(_, token)| token);
            if next != Some(&Token::Sym('^')) {
                self.cursor += 1;
                return Ok(Term::constant(-num));
            }
        }
        let operand = self.factor()?;
        Ok(&Term::constant(-1.) * &operand)
    }

    fn power(&mut self) -> Result<Term<f64>> {
        let base = self.primary()?;
        if self.eat('^') {
            let exponent = self.factor()?;
            Ok(base.pow(&exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<Term<f64>> {
        let Some((_, token)) = self.tokens.get(self.cursor).cloned() else {
            return self.error("unexpected end of input");
        };
        match token {
            Token::Num(num) => {
                self.cursor += 1;
                Ok(Term::constant(num))
            }
            Token::Sym('(') => {
                self.cursor += 1;
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Token::Ident(name) => {
                self.cursor += 1;
                if self.eat('(') {
                    self.call(&name)
                } else {
                    self.variable(name)
                }
            }
            Token::Sym(c) => self.error(format!("unexpected {c:?}")),
        }
    }

    fn call(&mut self, name: &str) -> Result<Term<f64>> {
        let op: Op = name.parse()?;
        let mut args = vec![self.expr()?];
        while self.eat(',') {
            args.push(self.expr()?);
        }
        self.expect(')')?;
        let args: Vec<_> = args.iter().collect();
        Term::apply(op, &args)
    }

    fn variable(&mut self, name: String) -> Result<Term<f64>> {
        if let Some(var) = self.variables.get(&name) {
            return Ok(var.clone());
        }
        let value = *self
            .bindings
            .get(&name)
            .ok_or_else(|| Error::UnboundVariable(name.clone()))?;
        let var = Term::variable(name.clone(), value);
        self.variables.insert(name, var.clone());
        Ok(var)
    }
}

/// Parse `src` into a graph, taking variable values from `bindings`.
/// Each distinct identifier becomes exactly one variable node.
pub fn parse(src: &str, bindings: &HashMap<String, f64>) -> Result<Term<f64>> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        cursor: 0,
        end: src.len(),
        bindings,
        variables: HashMap::new(),
    };
    let root = parser.expr()?;
    if parser.cursor != parser.tokens.len() {
        return parser.error("trailing input");
    }
    Ok(root)
}

/// Parse a `name=value` binding.
pub fn parse_binding(text: &str) -> Result<(String, f64)> {
    let invalid = || Error::InvalidBinding(text.to_string());
    let (name, value) = text.split_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let value = value.trim().parse().map_err(|_| invalid())?;
    Ok((name.to_string(), value))
}
