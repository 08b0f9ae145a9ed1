use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KiraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickPolicy {
    All,
    One,
    None,
}

impl fmt::Display for PickPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickPolicy::All => write!(f, "all"),
            PickPolicy::One => write!(f, "one"),
            PickPolicy::None => write!(f, "none"),
        }
    }
}

impl FromStr for PickPolicy {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" | "" => Ok(PickPolicy::All),
            "one" => Ok(PickPolicy::One),
            "none" => Ok(PickPolicy::None),
            other => Err(KiraError::InvalidFilterValue {
                field: "keep_samples_from_same_case".to_string(),
                value: other.to_string(),
                expected: "[all one none]".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'a>(&self, id: &'a str) -> &'a str {
        let start = char_offset(id, self.start);
        let end = char_offset(id, self.end).max(start);
        &id[start..end]
    }
}

fn char_offset(id: &str, chars: usize) -> usize {
    id.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(id.len())
}

pub fn union<K: Ord>(groups: &BTreeMap<K, Vec<String>>) -> Vec<String> {
    groups
        .values()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted values present in every group. Zero groups give an empty result.
pub fn intersection<K: Ord>(groups: &BTreeMap<K, Vec<String>>) -> Vec<String> {
    if groups.is_empty() {
        return Vec::new();
    }
    let mut counts = BTreeMap::<&str, usize>::new();
    for values in groups.values() {
        let distinct = values.iter().map(String::as_str).collect::<BTreeSet<_>>();
        for value in distinct {
            *counts.entry(value).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count == groups.len())
        .map(|(value, _)| value.to_string())
        .collect()
}

pub fn multiplicity<T: Eq + Hash>(values: &[T]) -> HashMap<&T, usize> {
    let mut counts = HashMap::with_capacity(values.len());
    for value in values {
        *counts.entry(value).or_insert(0usize) += 1;
    }
    counts
}

pub fn pick_by_policy<T: Clone + Eq + Hash>(values: &[T], policy: PickPolicy) -> Vec<T> {
    match policy {
        PickPolicy::All => values.to_vec(),
        PickPolicy::One => {
            let mut seen = HashSet::with_capacity(values.len());
            values
                .iter()
                .filter(|value| seen.insert(*value))
                .cloned()
                .collect()
        }
        PickPolicy::None => {
            let counts = multiplicity(values);
            values
                .iter()
                .filter(|value| counts.get(value).copied() == Some(1))
                .cloned()
                .collect()
        }
    }
}

pub fn group_by_span(ids: &[String], key: Span, value: Span) -> BTreeMap<String, Vec<String>> {
    let mut grouped = BTreeMap::<String, BTreeSet<String>>::new();
    for id in ids {
        grouped
            .entry(key.slice(id).to_string())
            .or_default()
            .insert(value.slice(id).to_string());
    }
    grouped
        .into_iter()
        .map(|(key, values)| (key, values.into_iter().collect()))
        .collect()
}

pub fn distinct_spans(ids: &[String], span: Span) -> Vec<String> {
    ids.iter()
        .map(|id| span.slice(id).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(key, values)| {
                (
                    key.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn repeated_value_counts_once_per_group() {
        let input = groups(&[("01", &["a", "a", "b"]), ("11", &["b", "c"])]);
        assert_eq!(intersection(&input), vec!["b"]);
    }

    #[test]
    fn intersection_within_union() {
        let cases: [&[(&str, &[&str])]; 5] = [
            &[],
            &[("01", &["a", "b"])],
            &[("01", &["a", "b"]), ("11", &["b", "c"])],
            &[("01", &["a"]), ("11", &["b"]), ("06", &["c"])],
            &[("01", &["c", "a", "a"]), ("11", &["a", "c"]), ("06", &["c", "a", "d"])],
        ];
        for entries in cases {
            let input = groups(entries);
            let all = union(&input);
            let shared = intersection(&input);
            assert!(shared.iter().all(|value| all.contains(value)), "{entries:?}");
            for values in input.values() {
                assert!(shared.iter().all(|value| values.contains(value)), "{entries:?}");
                assert!(values.iter().all(|value| all.contains(value)), "{entries:?}");
            }
            assert!(all.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(shared.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn policies_on_repeated_values() {
        let cases: [(&[&str], &[&str], &[&str]); 5] = [
            (&[], &[], &[]),
            (&["a"], &["a"], &["a"]),
            (&["a", "a"], &["a"], &[]),
            (&["b", "a", "b", "c"], &["b", "a", "c"], &["a", "c"]),
            (&["x", "y", "x", "y", "x"], &["x", "y"], &[]),
        ];
        for (values, one, none) in cases {
            assert_eq!(pick_by_policy(values, PickPolicy::All), values);
            assert_eq!(pick_by_policy(values, PickPolicy::One), one);
            assert_eq!(pick_by_policy(values, PickPolicy::None), none);

            let counts = multiplicity(values);
            assert_eq!(pick_by_policy(values, PickPolicy::One).len(), counts.len());
            assert!(none.iter().all(|value| counts[value] == 1 && one.contains(value)));
        }
    }

    #[test]
    fn span_clamps_short_ids() {
        let span = Span::new(13, 15);
        assert_eq!(span.slice("TCGA-A1-A0SB-01A"), "01");
        assert_eq!(span.slice("TCGA-A1"), "");
        assert_eq!(Span::new(0, 12).slice("TCGA-A1"), "TCGA-A1");
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("".parse::<PickPolicy>().unwrap(), PickPolicy::All);
        assert_eq!("One".parse::<PickPolicy>().unwrap(), PickPolicy::One);
        assert!("some".parse::<PickPolicy>().is_err());
    }
}
