// src/model/predicate.rs

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("empty predicate")]
    Empty,
    #[error("malformed predicate: {0}")]
    Malformed(String),
    #[error("nested parentheses are not allowed: {0}")]
    Nested(String),
}

/// A named relation over a flat argument list, e.g. `at(robot1, dock)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub name: String,
    pub args: Vec<String>,
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][\w\-]*)\s*\((.*)\)$").expect("predicate pattern is valid")
    })
}

fn bare_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][\w\-]*$").expect("token pattern is valid"))
}

fn embedded_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z_][\w\-]*\s*\([^()]*\)").expect("embedded pattern is valid")
    })
}

impl Predicate {
    pub fn parse(text: &str) -> Result<Self, PredicateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PredicateError::Empty);
        }

        if !text.contains('(') && !text.contains(')') {
            if !bare_pattern().is_match(text) {
                return Err(PredicateError::Malformed(text.to_string()));
            }
            return Ok(Self {
                name: text.to_lowercase(),
                args: Vec::new(),
            });
        }

        let caps = call_pattern()
            .captures(text)
            .ok_or_else(|| PredicateError::Malformed(text.to_string()))?;
        let inner = &caps[2];
        if inner.contains('(') || inner.contains(')') {
            return Err(PredicateError::Nested(text.to_string()));
        }

        let args = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|a| a.trim().to_string()).collect()
        };

        Ok(Self {
            name: caps[1].to_lowercase(),
            args,
        })
    }

    /// Like `parse`, but also finds a call wrapped in surrounding text such
    /// as `1. pick_up(box)` or `robot1: place(box)`.
    pub fn find(text: &str) -> Result<Self, PredicateError> {
        match Self::parse(text) {
            Err(PredicateError::Malformed(_)) => match embedded_pattern().find(text) {
                Some(call) => Self::parse(call.as_str()),
                None => Err(PredicateError::Malformed(text.trim().to_string())),
            },
            other => other,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}({})", self.name, self.args.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_with_arguments() {
        let p = Predicate::parse("At(robot1,  dock )").unwrap();
        assert_eq!(p.name, "at");
        assert_eq!(p.args, vec!["robot1", "dock"]);
        assert_eq!(p.to_string(), "at(robot1, dock)");
    }

    #[test]
    fn bare_token_is_zero_argument() {
        let p = Predicate::parse("handempty").unwrap();
        assert_eq!(p.name, "handempty");
        assert!(p.args.is_empty());

        let p = Predicate::parse("handempty()").unwrap();
        assert!(p.args.is_empty());
    }

    #[test]
    fn rejects_nested_and_garbage() {
        assert_eq!(
            Predicate::parse("on(a, top(b))"),
            Err(PredicateError::Nested("on(a, top(b))".into()))
        );
        assert!(matches!(
            Predicate::parse("pick up the box"),
            Err(PredicateError::Malformed(_))
        ));
        assert_eq!(Predicate::parse("   "), Err(PredicateError::Empty));
    }

    #[test]
    fn find_skips_list_markers_and_robot_tags() {
        let p = Predicate::find("1. pick_up(box1)").unwrap();
        assert_eq!(p.to_string(), "pick_up(box1)");

        let p = Predicate::find("robot1: Place(box, shelf)").unwrap();
        assert_eq!(p.name, "place");
        assert_eq!(p.args, vec!["box", "shelf"]);

        assert_eq!(Predicate::find("handempty").unwrap().name, "handempty");
        assert!(matches!(
            Predicate::find("pick up the box"),
            Err(PredicateError::Malformed(_))
        ));
        assert!(matches!(
            Predicate::find("on(a, top(b))"),
            Err(PredicateError::Nested(_))
        ));
    }

    #[test]
    fn empty_argument_is_not_returned() {
        let p = Predicate::parse("place(, shelf)").unwrap();
        assert_eq!(p.arg(0), None);
        assert_eq!(p.arg(1), Some("shelf"));
    }
}
