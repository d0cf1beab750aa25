//! Boolean conditions gating dependencies, build options and exports.
//!
//! Conditions are small expressions such as `windows && !NO_FBX` or
//! `test || release`. Identifiers are platform tags (`windows`, `linux`, ...,
//! plus `unix` for every non-windows platform), `test` (tests were
//! requested), `release`, the literals `true`/`false`, and otherwise feature
//! flag names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::platform::Platform;
use crate::core::run_config::RunConfig;

/// A malformed condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid condition `{expr}`: {reason}")]
pub struct ConditionError {
    pub expr: String,
    pub reason: String,
}

/// Words that are never interpreted as feature flags.
pub fn is_reserved_word(word: &str) -> bool {
    matches!(word, "unix" | "test" | "release" | "true" | "false")
        || Platform::ALL.iter().any(|p| p.as_str() == word)
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Condition {
    Literal(bool),
    Platform(Platform),
    Unix,
    Test,
    Release,
    Flag(String),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Shorthand for a flag reference.
    pub fn flag(name: impl Into<String>) -> Self {
        Condition::Flag(name.into())
    }

    /// Evaluate against the resolved configuration of a run.
    pub fn evaluate(&self, cfg: &RunConfig) -> bool {
        match self {
            Condition::Literal(value) => *value,
            Condition::Platform(platform) => cfg.platform == *platform,
            Condition::Unix => cfg.platform.is_unix(),
            Condition::Test => cfg.tests_requested(),
            Condition::Release => cfg.release,
            Condition::Flag(name) => cfg.flags.get(name),
            Condition::Not(inner) => !inner.evaluate(cfg),
            Condition::And(lhs, rhs) => lhs.evaluate(cfg) && rhs.evaluate(cfg),
            Condition::Or(lhs, rhs) => lhs.evaluate(cfg) || rhs.evaluate(cfg),
        }
    }

    /// Feature flag names referenced anywhere in the expression.
    pub fn flag_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_flags(&mut names);
        names
    }

    fn collect_flags<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Flag(name) => out.push(name),
            Condition::Not(inner) => inner.collect_flags(out),
            Condition::And(lhs, rhs) | Condition::Or(lhs, rhs) => {
                lhs.collect_flags(out);
                rhs.collect_flags(out);
            }
            _ => {}
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        let prec = match self {
            Condition::Or(..) => 1,
            Condition::And(..) => 2,
            _ => 3,
        };
        if prec < parent {
            f.write_str("(")?;
        }
        match self {
            Condition::Literal(value) => write!(f, "{}", value)?,
            Condition::Platform(platform) => write!(f, "{}", platform)?,
            Condition::Unix => f.write_str("unix")?,
            Condition::Test => f.write_str("test")?,
            Condition::Release => f.write_str("release")?,
            Condition::Flag(name) => f.write_str(name)?,
            Condition::Not(inner) => {
                f.write_str("!")?;
                inner.fmt_prec(f, 3)?;
            }
            Condition::And(lhs, rhs) => {
                lhs.fmt_prec(f, 2)?;
                f.write_str(" && ")?;
                rhs.fmt_prec(f, 2)?;
            }
            Condition::Or(lhs, rhs) => {
                lhs.fmt_prec(f, 1)?;
                f.write_str(" || ")?;
                rhs.fmt_prec(f, 1)?;
            }
        }
        if prec < parent {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: String| ConditionError {
            expr: s.to_string(),
            reason,
        };

        let tokens = tokenize(s).map_err(fail)?;
        if tokens.is_empty() {
            return Err(fail("expression is empty".to_string()));
        }

        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser.parse_or().map_err(fail)?;
        if let Some(token) = parser.peek() {
            return Err(fail(format!("unexpected `{}`", token)));
        }
        Ok(condition)
    }
}

impl TryFrom<String> for Condition {
    type Error = ConditionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Not => f.write_str("!"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(format!("expected `{}{}`", c, c));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character `{}`", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Condition, String> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Condition, String> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Condition, String> {
        match self.next() {
            Some(Token::Not) => Ok(Condition::Not(Box::new(self.parse_unary()?))),
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("missing `)`".to_string()),
                }
            }
            Some(Token::Ident(name)) => Ok(ident_to_condition(name)),
            Some(other) => Err(format!("unexpected `{}`", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn ident_to_condition(name: String) -> Condition {
    match name.as_str() {
        "true" => Condition::Literal(true),
        "false" => Condition::Literal(false),
        "unix" => Condition::Unix,
        "test" => Condition::Test,
        "release" => Condition::Release,
        other => match other.parse::<Platform>() {
            Ok(platform) if platform.as_str() == other => Condition::Platform(platform),
            _ => Condition::Flag(name),
        },
    }
}
