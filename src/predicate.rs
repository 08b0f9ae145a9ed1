use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const ACCESS: &str = "access";
pub const PROJECT_ID: &str = "cases.project.project_id";
pub const CASE_ID: &str = "cases.submitter_id";
pub const SAMPLE_ID: &str = "cases.samples.submitter_id";
pub const SAMPLE_TYPE_ID: &str = "cases.samples.sample_type_id";
pub const ALIQUOT_ID: &str = "cases.samples.portions.analytes.aliquots.submitter_id";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    fields: BTreeMap<String, Vec<String>>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<I, F, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (F, Vec<V>)>,
        F: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(field, values)| {
                    (field.into(), values.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }

    pub fn with_field(&self, field: &str, values: Vec<String>) -> Self {
        let mut derived = self.clone();
        derived.fields.insert(field.to_string(), values);
        derived
    }

    pub fn values(&self, field: &str) -> &[String] {
        self.fields
            .get(field)
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, values)| (field.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field-wise concatenation of every predicate, in iteration order.
    /// Values are not deduplicated.
    pub fn concat<'a>(predicates: impl IntoIterator<Item = &'a Predicate>) -> Self {
        let mut merged = BTreeMap::<String, Vec<String>>::new();
        for predicate in predicates {
            for (field, values) in &predicate.fields {
                merged
                    .entry(field.clone())
                    .or_default()
                    .extend(values.iter().cloned());
            }
        }
        Self { fields: merged }
    }

    pub fn to_filters(&self) -> Value {
        let content = self
            .fields
            .iter()
            .map(|(field, values)| {
                json!({
                    "op": "in",
                    "content": { "field": field, "value": values },
                })
            })
            .collect::<Vec<_>>();
        json!({ "op": "and", "content": content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_predicate_leaves_source_untouched() {
        let base = Predicate::from_fields([(CASE_ID, vec!["TCGA-A1-A0SB"])]);
        let narrowed = base.with_field(CASE_ID, vec!["TCGA-A2-A0T0".to_string()]);
        assert_eq!(base.values(CASE_ID).to_vec(), vec!["TCGA-A1-A0SB".to_string()]);
        assert_eq!(narrowed.values(CASE_ID).to_vec(), vec!["TCGA-A2-A0T0".to_string()]);
    }

    #[test]
    fn filters_document_shape() {
        let predicate = Predicate::from_fields([(ACCESS, vec!["open"])]);
        let filters = predicate.to_filters();
        assert_eq!(filters["op"], "and");
        assert_eq!(filters["content"][0]["op"], "in");
        assert_eq!(filters["content"][0]["content"]["field"], "access");
        assert_eq!(filters["content"][0]["content"]["value"][0], "open");
    }
}
