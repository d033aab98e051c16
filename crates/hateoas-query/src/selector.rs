//! Selector parser. Splits dotted selectors into typed steps.
//!
//! Grammar:
//! ```text
//! selector := step ("." step)*
//! step     := ["@"] name [ "[" [digits] "]" ]
//! name     := any run of characters excluding "." and "["
//! ```
//!
//! Traversal only needs the head step at each level, so [`split_head`]
//! classifies the head and hands back the tail unparsed.

use std::fmt;

use serde::Serialize;

/// Fan-out marker carried by an iterable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "index", rename_all = "snake_case")]
pub enum Iteration {
    /// `[]`: every item of the collection.
    All,
    /// `[N]`: only the N-th item (zero-based).
    Index(usize),
}

/// A single step of a selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// A link or a plain attribute, e.g. `accounts` or `accounts[]`.
    Attribute {
        name: String,
        iteration: Option<Iteration>,
    },
    /// An action, e.g. `@cancel`.
    Action {
        name: String,
        iteration: Option<Iteration>,
    },
}

impl Step {
    /// Classify one raw step.
    ///
    /// Bracket content that is not a valid index (`[x]`, an overflowing
    /// number) still marks the step iterable but selects every item.
    pub fn parse(text: &str) -> Step {
        let (is_action, rest) = match text.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (name, iteration) = split_iteration(rest);
        let name = name.to_string();
        if is_action {
            Step::Action { name, iteration }
        } else {
            Step::Attribute { name, iteration }
        }
    }

    /// Base name used for link, action and attribute lookups.
    pub fn name(&self) -> &str {
        match self {
            Step::Attribute { name, .. } | Step::Action { name, .. } => name,
        }
    }

    pub fn iteration(&self) -> Option<Iteration> {
        match self {
            Step::Attribute { iteration, .. } | Step::Action { iteration, .. } => *iteration,
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self, Step::Action { .. })
    }

    pub fn is_iterable(&self) -> bool {
        self.iteration().is_some()
    }

    /// Index selected by a `[N]` marker.
    pub fn filter(&self) -> Option<usize> {
        match self.iteration() {
            Some(Iteration::Index(n)) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_action() {
            write!(f, "@")?;
        }
        write!(f, "{}", self.name())?;
        match self.iteration() {
            Some(Iteration::All) => write!(f, "[]"),
            Some(Iteration::Index(n)) => write!(f, "[{n}]"),
            None => Ok(()),
        }
    }
}

/// Split off and classify the head step, returning the unparsed tail.
///
/// Returns `None` once the selector is exhausted.
pub fn split_head(selector: &str) -> Option<(Step, &str)> {
    if selector.is_empty() {
        return None;
    }
    let (head, tail) = selector.split_once('.').unwrap_or((selector, ""));
    Some((Step::parse(head), tail))
}

/// Parse a whole selector.
pub fn parse(selector: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut rest = selector;
    while let Some((step, tail)) = split_head(rest) {
        steps.push(step);
        rest = tail;
    }
    steps
}

fn split_iteration(text: &str) -> (&str, Option<Iteration>) {
    let Some(open) = text.strip_suffix(']').and_then(|t| t.rfind('[')) else {
        return (text, None);
    };
    let name = &text[..open];
    let inner = &text[open + 1..text.len() - 1];
    let iteration = if inner.is_empty() {
        Iteration::All
    } else {
        inner
            .parse::<usize>()
            .map(Iteration::Index)
            .unwrap_or(Iteration::All)
    };
    (name, Some(iteration))
}
