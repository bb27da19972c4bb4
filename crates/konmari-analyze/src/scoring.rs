//! Additive confidence scoring over ordered `(signal, weight)` rules.

use konmari_core::{Confidence, ScoringRule, Signal};

/// Applies a rule list to a set of signals.
///
/// The score starts at `base`, every rule whose signal is present adds its
/// weight in rule order, and the sum is clamped to `0..=100`.
#[derive(Debug, Clone, Copy)]
pub struct ScoreCard<'a> {
    base: i32,
    rules: &'a [ScoringRule],
}

impl<'a> ScoreCard<'a> {
    /// Create a score card.
    pub fn new(base: i32, rules: &'a [ScoringRule]) -> Self {
        Self { base, rules }
    }

    /// Score a set of signals.
    pub fn score(&self, signals: &[Signal]) -> Confidence {
        Confidence::from_score(self.raw(signals))
    }

    /// The unclamped sum.
    pub fn raw(&self, signals: &[Signal]) -> i32 {
        self.contributions(signals)
            .fold(self.base, |acc, (_, weight)| acc.saturating_add(weight))
    }

    /// Each matched rule and its weight, in rule order.
    pub fn contributions<'s>(
        &'s self,
        signals: &'s [Signal],
    ) -> impl Iterator<Item = (Signal, i32)> + 's {
        self.rules
            .iter()
            .filter(|rule| signals.contains(&rule.signal))
            .map(|rule| (rule.signal, rule.weight))
    }
}
