//! Attribute-based access rules.
//!
//! A rule tree is evaluated against a set of candidate tokens and yields the
//! tokens that justify it. Leaf rules inspect one attribute claim per token
//! and fail closed: a missing or unparsable attribute never matches.

use std::collections::HashMap;

use aam_security::TokenSet;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Comparison applied by a boolean rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanOperator {
    IsTrue,
    IsFalse,
}

impl BooleanOperator {
    fn matches(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::IsTrue => value.eq_ignore_ascii_case("true"),
            Self::IsFalse => value.eq_ignore_ascii_case("false"),
        }
    }
}

/// Comparison applied by a numeric rule, `attribute <op> expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumericOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl NumericOperator {
    fn matches(self, actual: Decimal, expected: Decimal) -> bool {
        match self {
            Self::Equals => actual == expected,
            Self::NotEquals => actual != expected,
            Self::GreaterThan => actual > expected,
            Self::LessThan => actual < expected,
            Self::GreaterOrEqual => actual >= expected,
            Self::LessOrEqual => actual <= expected,
        }
    }
}

/// Relation applied by a string rule, `attribute <op> expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StringOperator {
    Equals,
    EqualsIgnoreCase,
    Contains,
    ContainsIgnoreCase,
    NotContains,
    NotContainsIgnoreCase,
    StartsWith,
    StartsWithIgnoreCase,
    EndsWith,
    EndsWithIgnoreCase,
    /// The whole attribute value must match the expected pattern.
    Regexp,
}

/// How a composite rule combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeOperator {
    /// Every child must match some token; yields the union of all matches.
    And,
    /// Yields the union of all matches.
    Or,
    /// Like `And`, but empty when every child matched.
    Nand,
    /// Yields all candidates when no child matched, nothing otherwise.
    Nor,
}

/// A node of an access rule tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "accessRuleType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessRule {
    #[serde(rename_all = "camelCase")]
    Boolean {
        attribute_name: String,
        operator: BooleanOperator,
    },
    #[serde(rename_all = "camelCase")]
    Numeric {
        attribute_name: String,
        expected_value: Decimal,
        operator: NumericOperator,
    },
    #[serde(rename_all = "camelCase")]
    String {
        attribute_name: String,
        expected_value: String,
        operator: StringOperator,
    },
    #[serde(rename_all = "camelCase")]
    Composite {
        #[serde(default)]
        access_rules: Vec<AccessRule>,
        operator: CompositeOperator,
    },
}

impl AccessRule {
    #[must_use]
    pub fn boolean(attribute_name: impl Into<String>, operator: BooleanOperator) -> Self {
        Self::Boolean {
            attribute_name: attribute_name.into(),
            operator,
        }
    }

    #[must_use]
    pub fn numeric(
        attribute_name: impl Into<String>,
        operator: NumericOperator,
        expected_value: impl Into<Decimal>,
    ) -> Self {
        Self::Numeric {
            attribute_name: attribute_name.into(),
            expected_value: expected_value.into(),
            operator,
        }
    }

    #[must_use]
    pub fn string(
        attribute_name: impl Into<String>,
        operator: StringOperator,
        expected_value: impl Into<String>,
    ) -> Self {
        Self::String {
            attribute_name: attribute_name.into(),
            expected_value: expected_value.into(),
            operator,
        }
    }

    #[must_use]
    pub fn composite(operator: CompositeOperator, access_rules: Vec<AccessRule>) -> Self {
        Self::Composite {
            access_rules,
            operator,
        }
    }

    /// Check that the tree can be evaluated.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidPolicyArguments`] for an invalid regular
    /// expression or an empty attribute name.
    pub fn validate(&self) -> Result<(), PolicyError> {
        CompiledPatterns::compile(self).map(|_| ())
    }

    /// Tokens among `tokens` that satisfy this rule.
    ///
    /// `REGEXP` patterns are compiled for this call only; a policy evaluates
    /// through the patterns it compiled at construction.
    #[must_use]
    pub fn is_met(&self, tokens: &TokenSet) -> TokenSet {
        self.is_met_with(tokens, &CompiledPatterns::default())
    }

    pub(crate) fn is_met_with(&self, tokens: &TokenSet, patterns: &CompiledPatterns) -> TokenSet {
        match self {
            Self::Boolean {
                attribute_name,
                operator,
            } => matching(tokens, attribute_name, |value| operator.matches(value)),
            Self::Numeric {
                attribute_name,
                expected_value,
                operator,
            } => matching(tokens, attribute_name, |value| {
                parse_decimal(value).is_some_and(|actual| operator.matches(actual, *expected_value))
            }),
            Self::String {
                attribute_name,
                expected_value,
                operator,
            } => string_matching(tokens, attribute_name, *operator, expected_value, patterns),
            Self::Composite {
                access_rules,
                operator,
            } => composite_matching(tokens, access_rules, *operator, patterns),
        }
    }
}

/// Whole-value regular expressions of a rule tree, keyed by their pattern.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledPatterns {
    regexes: HashMap<String, Regex>,
}

impl CompiledPatterns {
    /// Validate `rule` and compile each distinct `REGEXP` pattern in it.
    pub(crate) fn compile(rule: &AccessRule) -> Result<Self, PolicyError> {
        let mut compiled = Self::default();
        compiled.collect(rule)?;
        Ok(compiled)
    }

    fn collect(&mut self, rule: &AccessRule) -> Result<(), PolicyError> {
        match rule {
            AccessRule::Boolean { attribute_name, .. }
            | AccessRule::Numeric { attribute_name, .. } => check_attribute_name(attribute_name),
            AccessRule::String {
                attribute_name,
                expected_value,
                operator,
            } => {
                check_attribute_name(attribute_name)?;
                if *operator == StringOperator::Regexp && !self.regexes.contains_key(expected_value) {
                    let regex = whole_value_regex(expected_value).map_err(|e| {
                        PolicyError::invalid_arguments(format!(
                            "rule on '{attribute_name}' has an invalid pattern: {e}"
                        ))
                    })?;
                    self.regexes.insert(expected_value.clone(), regex);
                }
                Ok(())
            }
            AccessRule::Composite { access_rules, .. } => {
                access_rules.iter().try_for_each(|child| self.collect(child))
            }
        }
    }

    pub(crate) fn get(&self, pattern: &str) -> Option<&Regex> {
        self.regexes.get(pattern)
    }
}

fn check_attribute_name(name: &str) -> Result<(), PolicyError> {
    if name.trim().is_empty() {
        return Err(PolicyError::invalid_arguments(
            "access rule attribute name must not be empty",
        ));
    }
    Ok(())
}

fn matching(tokens: &TokenSet, attribute: &str, predicate: impl Fn(&str) -> bool) -> TokenSet {
    tokens
        .iter()
        .filter(|token| token.attribute(attribute).is_some_and(&predicate))
        .cloned()
        .collect()
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    let value = value.trim();
    value
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

fn whole_value_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

fn string_matching(
    tokens: &TokenSet,
    attribute: &str,
    operator: StringOperator,
    expected: &str,
    patterns: &CompiledPatterns,
) -> TokenSet {
    if operator == StringOperator::Regexp {
        if let Some(regex) = patterns.get(expected) {
            return matching(tokens, attribute, |value| regex.is_match(value));
        }
        return match whole_value_regex(expected) {
            Ok(regex) => matching(tokens, attribute, |value| regex.is_match(value)),
            Err(e) => {
                tracing::warn!(attribute, error = %e, "invalid pattern in access rule, denying");
                TokenSet::new()
            }
        };
    }

    let expected_lower = expected.to_lowercase();
    matching(tokens, attribute, |value| match operator {
        StringOperator::Equals => value == expected,
        StringOperator::EqualsIgnoreCase => value.to_lowercase() == expected_lower,
        StringOperator::Contains => value.contains(expected),
        StringOperator::ContainsIgnoreCase => value.to_lowercase().contains(&expected_lower),
        StringOperator::NotContains => !value.contains(expected),
        StringOperator::NotContainsIgnoreCase => !value.to_lowercase().contains(&expected_lower),
        StringOperator::StartsWith => value.starts_with(expected),
        StringOperator::StartsWithIgnoreCase => value.to_lowercase().starts_with(&expected_lower),
        StringOperator::EndsWith => value.ends_with(expected),
        StringOperator::EndsWithIgnoreCase => value.to_lowercase().ends_with(&expected_lower),
        StringOperator::Regexp => false,
    })
}

fn composite_matching(
    tokens: &TokenSet,
    rules: &[AccessRule],
    operator: CompositeOperator,
    patterns: &CompiledPatterns,
) -> TokenSet {
    let mut matched = TokenSet::new();
    let mut satisfied_rules = 0usize;
    for rule in rules {
        let met = rule.is_met_with(tokens, patterns);
        if !met.is_empty() {
            satisfied_rules += 1;
            matched.extend(met);
        }
    }

    // An empty child list counts as "all satisfied" and "none satisfied" at once.
    let all_satisfied = satisfied_rules == rules.len();
    match operator {
        CompositeOperator::And => {
            if all_satisfied {
                matched
            } else {
                TokenSet::new()
            }
        }
        CompositeOperator::Or => matched,
        CompositeOperator::Nand => {
            if all_satisfied {
                TokenSet::new()
            } else {
                matched
            }
        }
        CompositeOperator::Nor => {
            if satisfied_rules == 0 {
                tokens.clone()
            } else {
                TokenSet::new()
            }
        }
    }
}
