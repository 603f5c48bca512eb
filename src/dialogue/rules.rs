//! Ordered rule classifier
//!
//! A rule set is a list of `(predicate, label)` pairs evaluated in
//! priority order; the first predicate that holds decides the label.

use regex::Regex;

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

pub struct Rule<L> {
    label: L,
    predicate: Predicate,
}

impl<L> Rule<L> {
    pub fn new(label: L, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            label,
            predicate: Box::new(predicate),
        }
    }

    /// Holds when any of the patterns matches somewhere in the text
    pub fn any_pattern(label: L, patterns: &[&str]) -> Self {
        let compiled = compile(patterns);
        Self::new(label, move |text| compiled.iter().any(|re| re.is_match(text)))
    }

    pub fn label(&self) -> &L {
        &self.label
    }

    pub fn matches(&self, text: &str) -> bool {
        (self.predicate)(text)
    }
}

pub struct RuleSet<L> {
    rules: Vec<Rule<L>>,
}

impl<L: Clone> RuleSet<L> {
    pub fn new(rules: Vec<Rule<L>>) -> Self {
        Self { rules }
    }

    /// Label of the first rule that holds
    pub fn first_match(&self, text: &str) -> Option<L> {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.label.clone())
    }

    pub fn any_match(&self, text: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(text))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compile literal patterns; a bad literal is a programming error.
pub(crate) fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid rule pattern {:?}: {}", p, e)))
        .collect()
}
