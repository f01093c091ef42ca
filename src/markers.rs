//! Scenario markers, marker expressions and skip guards

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::status::KumaStatus;
use crate::{Error, Result};

/// Tag attached to a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Smoke,
    Search,
    Nondestructive,
    /// Rerun a failing scenario up to `reruns` more times
    Flaky { reruns: u32 },
}

impl Marker {
    pub fn name(&self) -> &'static str {
        match self {
            Marker::Smoke => "smoke",
            Marker::Search => "search",
            Marker::Nondestructive => "nondestructive",
            Marker::Flaky { .. } => "flaky",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Flaky { reruns } => write!(f, "flaky(reruns={})", reruns),
            other => f.write_str(other.name()),
        }
    }
}

/// Reruns granted by the markers; the largest `flaky` wins
pub fn reruns(markers: &[Marker]) -> u32 {
    markers
        .iter()
        .filter_map(|m| match m {
            Marker::Flaky { reruns } => Some(*reruns),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// Boolean selection over marker names, e.g. `smoke and not flaky`
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerExpr {
    Marker(String),
    Not(Box<MarkerExpr>),
    And(Box<MarkerExpr>, Box<MarkerExpr>),
    Or(Box<MarkerExpr>, Box<MarkerExpr>),
}

impl MarkerExpr {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.or()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(token) => Err(Error::configuration(format!(
                "Unexpected '{}' in marker expression '{}'",
                token, input
            ))),
        }
    }

    pub fn matches(&self, markers: &[Marker]) -> bool {
        match self {
            MarkerExpr::Marker(name) => markers.iter().any(|m| m.name() == name),
            MarkerExpr::Not(inner) => !inner.matches(markers),
            MarkerExpr::And(a, b) => a.matches(markers) && b.matches(markers),
            MarkerExpr::Or(a, b) => a.matches(markers) || b.matches(markers),
        }
    }
}

impl FromStr for MarkerExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in input.chars() {
        match c {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => current.push(c),
            other => {
                return Err(Error::configuration(format!(
                    "Invalid character '{}' in marker expression '{}'",
                    other, input
                )))
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<String>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn or(&mut self) -> Result<MarkerExpr> {
        let mut expr = self.and()?;
        while self.peek() == Some("or") {
            self.pos += 1;
            expr = MarkerExpr::Or(Box::new(expr), Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<MarkerExpr> {
        let mut expr = self.not()?;
        while self.peek() == Some("and") {
            self.pos += 1;
            expr = MarkerExpr::And(Box::new(expr), Box::new(self.not()?));
        }
        Ok(expr)
    }

    fn not(&mut self) -> Result<MarkerExpr> {
        if self.peek() == Some("not") {
            self.pos += 1;
            return Ok(MarkerExpr::Not(Box::new(self.not()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<MarkerExpr> {
        match self.next() {
            Some(token) if token == "(" => {
                let expr = self.or()?;
                match self.next() {
                    Some(close) if close == ")" => Ok(expr),
                    _ => Err(Error::configuration("Unbalanced parentheses in marker expression")),
                }
            }
            Some(token) if !matches!(token.as_str(), ")" | "and" | "or" | "not") => Ok(MarkerExpr::Marker(token)),
            Some(token) => Err(Error::configuration(format!(
                "Expected a marker name, found '{}'",
                token
            ))),
            None => Err(Error::configuration("Marker expression ended early")),
        }
    }
}

/// Outcome of a pre-scenario guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Run,
    Skip(String),
}

/// Predicate evaluated against the status snapshot before a scenario runs
pub type Guard = fn(&KumaStatus) -> SkipDecision;

pub fn skip_if_not_maintenance_mode(status: &KumaStatus) -> SkipDecision {
    if status.is_maintenance_mode() {
        SkipDecision::Run
    } else {
        SkipDecision::Skip("Only applies in maintenance mode".to_string())
    }
}

pub fn skip_if_maintenance_mode(status: &KumaStatus) -> SkipDecision {
    if status.is_maintenance_mode() {
        SkipDecision::Skip("Not available in maintenance mode".to_string())
    } else {
        SkipDecision::Run
    }
}
