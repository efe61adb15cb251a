//! Declarative field validation.
//!
//! A [`RuleSet`] names the checks a value must pass; [`check_validity`]
//! ANDs every check that is present. Checks that are absent (a `false`
//! flag, or a zero length bound) are skipped rather than failed.

pub mod form;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Characters accepted by the `hasSpecialChar` rule.
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

// Lowercase-only and unanchored: a well-formed address anywhere in the value matches.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*",
        r"@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?",
    ))
    .expect("email pattern is a valid regex")
});

/// A set of named checks applied to one value.
///
/// Deserializes from the camelCase keys the page sends (`minLength`,
/// `hasUpperCase`, ...). Unknown keys are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub email: bool,
    pub has_upper_case: bool,
    pub has_lower_case: bool,
    pub has_special_char: bool,
}

impl RuleSet {
    /// Iterates over the checks that are actually present.
    pub fn rules(&self) -> impl Iterator<Item = Rule> {
        [
            self.required.then_some(Rule::Required),
            self.min_length.filter(|n| *n > 0).map(Rule::MinLength),
            self.max_length.filter(|n| *n > 0).map(Rule::MaxLength),
            self.email.then_some(Rule::Email),
            self.has_upper_case.then_some(Rule::HasUpperCase),
            self.has_lower_case.then_some(Rule::HasLowerCase),
            self.has_special_char.then_some(Rule::HasSpecialChar),
        ]
        .into_iter()
        .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.rules().next().is_none()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = RuleSet::default();
        for rule in iter {
            match rule {
                Rule::Required => set.required = true,
                Rule::MinLength(n) => set.min_length = Some(n),
                Rule::MaxLength(n) => set.max_length = Some(n),
                Rule::Email => set.email = true,
                Rule::HasUpperCase => set.has_upper_case = true,
                Rule::HasLowerCase => set.has_lower_case = true,
                Rule::HasSpecialChar => set.has_special_char = true,
            }
        }
        set
    }
}

impl From<Rule> for RuleSet {
    fn from(rule: Rule) -> Self {
        std::iter::once(rule).collect()
    }
}

/// One validation predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
    HasUpperCase,
    HasLowerCase,
    HasSpecialChar,
}

impl Rule {
    pub fn holds(&self, value: &str) -> bool {
        match *self {
            Rule::Required => !trim(value).is_empty(),
            Rule::MinLength(n) => text_length(value) >= n,
            Rule::MaxLength(n) => text_length(value) <= n,
            Rule::Email => EMAIL_PATTERN.is_match(value),
            Rule::HasUpperCase => value.chars().any(|c| c.is_ascii_uppercase()),
            Rule::HasLowerCase => value.chars().any(|c| c.is_ascii_lowercase()),
            Rule::HasSpecialChar => value.chars().any(|c| SPECIAL_CHARS.contains(c)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::MinLength(_) => "minLength",
            Rule::MaxLength(_) => "maxLength",
            Rule::Email => "email",
            Rule::HasUpperCase => "hasUpperCase",
            Rule::HasLowerCase => "hasLowerCase",
            Rule::HasSpecialChar => "hasSpecialChar",
        }
    }
}

/// Returns `true` iff `value` passes every check present in `rules`.
///
/// An empty rule set always passes.
pub fn check_validity(value: &str, rules: &RuleSet) -> bool {
    rules.rules().all(|rule| rule.holds(value))
}

/// Length in UTF-16 code units, so astral characters count as two.
pub fn text_length(value: &str) -> usize {
    value.encode_utf16().count()
}

fn trim(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Ordered `(rule, message)` table for one form field.
///
/// Order matters: only the message of the first failing rule is reported.
#[derive(Debug, Clone)]
pub struct FieldRules {
    entries: Vec<(Rule, &'static str)>,
}

impl FieldRules {
    pub fn new(entries: Vec<(Rule, &'static str)>) -> Self {
        Self { entries }
    }

    /// The combined rule set of the whole table.
    pub fn rule_set(&self) -> RuleSet {
        self.entries.iter().map(|(rule, _)| *rule).collect()
    }

    pub fn entries(&self) -> &[(Rule, &'static str)] {
        &self.entries
    }

    /// Message of the first rule, in declared order, that fails on its own.
    pub fn first_failure(&self, value: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(rule, _)| !check_validity(value, &RuleSet::from(*rule)))
            .map(|(_, message)| *message)
    }

    /// Validates `value` against the full table.
    pub fn validate(&self, value: &str) -> Option<&'static str> {
        if check_validity(value, &self.rule_set()) {
            None
        } else {
            self.first_failure(value)
        }
    }
}
