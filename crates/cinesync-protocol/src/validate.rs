//! Declarative validation of raw request payloads.
//!
//! A request contract is a list of [`FieldRule`]s, each pairing a dotted
//! field path (`"user.file.size"`) with a [`Constraint`]. [`validate`]
//! checks a JSON payload against the list and reports every violation,
//! keyed by path, in [`FieldErrors`].
//!
//! Per field, checks run in this order and stop at the first failure of
//! presence or kind: presence, kind, length, numericality, inclusion.
//! An absent optional field passes without further checks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Constraint contract
// ---------------------------------------------------------------------------

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Object,
    Number,
    Boolean,
}

impl ValueKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Object => value.is_object(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Object => "object",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Bounds on a string's length, in characters. Both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    pub minimum: Option<usize>,
    pub maximum: Option<usize>,
}

/// Numeric constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Numericality {
    pub only_integer: bool,
    pub greater_than_or_equal_to: Option<f64>,
    pub less_than_or_equal_to: Option<f64>,
}

/// Constraints on a single field.
///
/// Built with `const` builder methods so contracts can live in `const`
/// tables next to the request types:
///
/// ```rust
/// use cinesync_protocol::{Constraint, FieldRule, ValueKind};
///
/// const RULES: &[FieldRule] = &[FieldRule::new(
///     "room.name",
///     Constraint::new().required().kind(ValueKind::String).length(2, 20),
/// )];
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub presence: bool,
    pub kind: Option<ValueKind>,
    pub length: Option<Length>,
    pub numericality: Option<Numericality>,
    pub inclusion: Option<&'static [&'static str]>,
}

impl Constraint {
    /// A constraint that accepts anything, including absence.
    pub const fn new() -> Self {
        Self {
            presence: false,
            kind: None,
            length: None,
            numericality: None,
            inclusion: None,
        }
    }

    /// The field must be present and not `null`.
    pub const fn required(mut self) -> Self {
        self.presence = true;
        self
    }

    pub const fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// String length between `minimum` and `maximum` characters.
    pub const fn length(mut self, minimum: usize, maximum: usize) -> Self {
        self.length = Some(Length {
            minimum: Some(minimum),
            maximum: Some(maximum),
        });
        self
    }

    pub const fn integer(mut self) -> Self {
        let mut n = self.numeric();
        n.only_integer = true;
        self.numericality = Some(n);
        self
    }

    pub const fn at_least(mut self, bound: f64) -> Self {
        let mut n = self.numeric();
        n.greater_than_or_equal_to = Some(bound);
        self.numericality = Some(n);
        self
    }

    pub const fn at_most(mut self, bound: f64) -> Self {
        let mut n = self.numeric();
        n.less_than_or_equal_to = Some(bound);
        self.numericality = Some(n);
        self
    }

    const fn numeric(&self) -> Numericality {
        match self.numericality {
            Some(n) => n,
            None => Numericality {
                only_integer: false,
                greater_than_or_equal_to: None,
                less_than_or_equal_to: None,
            },
        }
    }

    /// The value must be one of `allowed` (compared as strings).
    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.inclusion = Some(allowed);
        self
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Self::new()
    }
}

/// A constraint bound to a dotted field path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub path: &'static str,
    pub constraint: Constraint,
}

impl FieldRule {
    pub const fn new(path: &'static str, constraint: Constraint) -> Self {
        Self { path, constraint }
    }
}

// ---------------------------------------------------------------------------
// FieldErrors
// ---------------------------------------------------------------------------

/// Validation messages keyed by field path.
///
/// Serializes as a plain object: `{"user.name": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Records a message for `path`.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_default().push(message.into());
    }

    /// Messages recorded for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Number of fields with at least one message.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates fields in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Checks `payload` against every rule and collects all violations.
pub fn validate(payload: &Value, rules: &[FieldRule]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    for rule in rules {
        check_field(payload, rule, &mut errors);
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_field(payload: &Value, rule: &FieldRule, errors: &mut FieldErrors) {
    let c = &rule.constraint;
    let label = humanize(rule.path);

    let value = match lookup(payload, rule.path) {
        Some(v) if !v.is_null() => v,
        _ => {
            if c.presence {
                errors.add(rule.path, format!("{label} can't be blank"));
            }
            return;
        }
    };

    if let Some(kind) = c.kind {
        if !kind.matches(value) {
            errors.add(
                rule.path,
                format!("{label} must be of type {}", kind.name()),
            );
            return;
        }
    }

    if let (Some(length), Some(s)) = (c.length, value.as_str()) {
        let len = s.chars().count();
        if let Some(min) = length.minimum.filter(|min| len < *min) {
            errors.add(
                rule.path,
                format!("{label} is too short (minimum is {min} characters)"),
            );
        }
        if let Some(max) = length.maximum.filter(|max| len > *max) {
            errors.add(
                rule.path,
                format!("{label} is too long (maximum is {max} characters)"),
            );
        }
    }

    if let Some(n) = c.numericality {
        match value.as_f64() {
            None => errors.add(rule.path, format!("{label} is not a number")),
            Some(x) => {
                if n.only_integer && x.fract() != 0.0 {
                    errors.add(rule.path, format!("{label} must be an integer"));
                }
                if let Some(bound) =
                    n.greater_than_or_equal_to.filter(|b| x < *b)
                {
                    errors.add(
                        rule.path,
                        format!(
                            "{label} must be greater than or equal to {bound}"
                        ),
                    );
                }
                if let Some(bound) = n.less_than_or_equal_to.filter(|b| x > *b)
                {
                    errors.add(
                        rule.path,
                        format!("{label} must be less than or equal to {bound}"),
                    );
                }
            }
        }
    }

    if let Some(allowed) = c.inclusion {
        let included = value
            .as_str()
            .is_some_and(|s| allowed.contains(&s));
        if !included {
            errors.add(
                rule.path,
                format!("{label} is not included in the list"),
            );
        }
    }
}

/// Walks a dotted path through nested objects.
fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(payload, |node, key| node.as_object()?.get(key))
}

/// `"user.file.size"` → `"User file size"`, `"currentTime"` → `"Current time"`.
fn humanize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 4);
    for ch in path.chars() {
        match ch {
            '.' | '_' => out.push(' '),
            c if c.is_uppercase() => {
                out.push(' ');
                out.extend(c.to_lowercase());
            }
            c => out.push(c),
        }
    }
    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
