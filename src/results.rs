use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::HexColor;
use crate::config::PollOption;

/// Vote counts per option id, as last reported by the counting service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Totals(BTreeMap<String, u64>);

impl Totals {
    /// Every option at zero. Used when the service cannot be reached.
    pub fn zeroed(options: &[PollOption]) -> Self {
        Self(options.iter().map(|o| (o.id.clone(), 0)).collect())
    }

    /// Add a zero entry for every option the service left out.
    pub fn with_options(mut self, options: &[PollOption]) -> Self {
        for option in options {
            self.0.entry(option.id.clone()).or_insert(0);
        }
        self
    }

    pub fn get(&self, id: &str) -> u64 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Sum over every entry, including ids this client does not know.
    /// Saturates instead of overflowing on absurd counts from the service.
    pub fn sum(&self) -> u64 {
        self.0.values().fold(0, |acc, &n| acc.saturating_add(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for Totals {
    fn from_iter<T: IntoIterator<Item = (K, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One bar of the results list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub id: String,
    pub label: String,
    pub color: HexColor,
    pub count: u64,
    pub percentage: u32,
    /// The option this session just voted for.
    pub emphasized: bool,
}

impl ResultRow {
    /// `"75% (3)"`
    pub fn summary(&self) -> String {
        format!("{}% ({})", self.percentage, self.count)
    }

    /// Bar fill as a 0..1 fraction.
    pub fn fraction(&self) -> f64 {
        self.percentage as f64 / 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub total: u64,
    pub rows: Vec<ResultRow>,
}

impl ResultsView {
    pub fn total_label(&self) -> String {
        format!("Total votes: {}", self.total)
    }
}

/// Rounded share of `total`, 0 when nobody has voted.
pub fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Lay out one row per option, in declared order.
pub fn render_results(
    options: &[PollOption],
    totals: &Totals,
    voted_for: Option<&str>,
) -> ResultsView {
    let total = totals.sum();
    let rows = options
        .iter()
        .map(|option| {
            let count = totals.get(&option.id);
            ResultRow {
                id: option.id.clone(),
                label: option.label.clone(),
                color: option.color.clone(),
                count,
                percentage: percentage(count, total),
                emphasized: voted_for == Some(option.id.as_str()),
            }
        })
        .collect();

    ResultsView { total, rows }
}
