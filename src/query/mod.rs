//! Requirement expressions: comma-separated tokens asking for the presence
//! (`501Y`) or absence (`!69-`) of a mutation.
//!
//! A token may carry its `from` residue (`N501Y`); it is ignored. Matching
//! is a prefix comparison against each mutation's suffix (`501Y` for
//! `N501Y`), so `501` matches any change at 501. A match is rejected when
//! the mutation suffix continues with a digit, so `47` never matches `470Y`.

use std::fmt;
use std::str::FromStr;

use crate::mutation::Mutation;
use crate::sample::Sample;

/// One parsed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    token: String,
    needle: String,
    negated: bool,
}

impl Requirement {
    /// Parse a single token. Never fails; tokens that cannot match any
    /// mutation come back invalid and are never satisfied.
    pub fn parse(token: &str) -> Self {
        let (negated, body) = match token.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let needle = match body.chars().next() {
            Some(c) if !c.is_ascii_digit() => &body[c.len_utf8()..],
            _ => body,
        };

        Self {
            token: token.to_string(),
            needle: needle.to_string(),
            negated,
        }
    }

    /// Original token text.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the token asks for absence.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the token can match anything: the text after the optional
    /// `!` and `from` residue must start with a residue number.
    pub fn is_valid(&self) -> bool {
        self.needle.as_bytes().first().is_some_and(u8::is_ascii_digit)
    }

    /// Whether `mutation` is what the token names.
    pub fn matches_mutation(&self, mutation: &Mutation) -> bool {
        if !self.is_valid() {
            return false;
        }
        let suffix = mutation.suffix();
        let suffix = suffix.as_bytes();
        let needle = self.needle.as_bytes();
        let len = needle.len().min(suffix.len());

        if suffix[..len] != needle[..len] {
            return false;
        }
        !suffix.get(len).is_some_and(u8::is_ascii_digit)
    }

    /// Whether `mutations` satisfy this token.
    pub fn is_satisfied_by(&self, mutations: &[Mutation]) -> bool {
        if !self.is_valid() {
            return false;
        }
        let found = mutations.iter().any(|m| self.matches_mutation(m));
        found != self.negated
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Parsed expression: every token must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    requirements: Vec<Requirement>,
}

impl RequirementSet {
    /// Split `expression` on commas. Surrounding whitespace is trimmed; an
    /// expression that is entirely blank places no constraint.
    pub fn parse(expression: &str) -> Self {
        if expression.trim().is_empty() {
            return Self::default();
        }
        Self {
            requirements: expression
                .split(',')
                .map(|t| Requirement::parse(t.trim()))
                .collect(),
        }
    }

    /// Tokens in written order.
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Whether the expression places no constraint.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// First token (in written order) that `mutations` fail.
    pub fn first_failure(&self, mutations: &[Mutation]) -> Option<&Requirement> {
        self.requirements
            .iter()
            .find(|r| !r.is_satisfied_by(mutations))
    }

    /// Whether `mutations` satisfy every token.
    pub fn matches_mutations(&self, mutations: &[Mutation]) -> bool {
        self.first_failure(mutations).is_none()
    }

    /// Whether `sample`'s mutation list satisfies every token.
    pub fn matches(&self, sample: &Sample) -> bool {
        self.matches_mutations(sample.mutations())
    }

    /// Tokens joined with `+`, as used in short group names.
    pub fn short_text(&self) -> String {
        self.requirements
            .iter()
            .map(Requirement::token)
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl FromStr for RequirementSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for RequirementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.requirements.iter().map(Requirement::token).collect();
        f.write_str(&tokens.join(","))
    }
}
