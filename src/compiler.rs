use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::CatalogQuery;
use crate::config::{BarcodeLayout, Settings};
use crate::domain::{ALL_GROUP, OmicsType};
use crate::error::KiraError;
use crate::filter::FilterSpec;
use crate::predicate::{ACCESS, ALIQUOT_ID, CASE_ID, PROJECT_ID, Predicate, SAMPLE_ID, SAMPLE_TYPE_ID};
use crate::sets::{self, PickPolicy};

pub type GroupPredicates = BTreeMap<String, Predicate>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompiledCohort {
    pub groups: BTreeMap<OmicsType, GroupPredicates>,
}

impl CompiledCohort {
    pub fn iter(&self) -> impl Iterator<Item = (OmicsType, &str, &Predicate)> {
        self.groups.iter().flat_map(|(omics, groups)| {
            groups
                .iter()
                .map(move |(group, predicate)| (*omics, group.as_str(), predicate))
        })
    }

    pub fn get(&self, omics: OmicsType, group: &str) -> Option<&Predicate> {
        self.groups.get(&omics).and_then(|groups| groups.get(group))
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseCombine {
    Intersection,
    Union,
}

pub struct CohortCompiler<'a, C: CatalogQuery> {
    catalog: &'a C,
    settings: &'a Settings,
}

impl<'a, C: CatalogQuery> CohortCompiler<'a, C> {
    pub fn new(catalog: &'a C, settings: &'a Settings) -> Self {
        Self { catalog, settings }
    }

    pub fn compile(&self, spec: &FilterSpec) -> Result<CompiledCohort, KiraError> {
        self.validate(spec)?;

        let mut cohort = CompiledCohort::default();
        for &omics in &spec.omics_types {
            if cohort.groups.contains_key(&omics) {
                continue;
            }
            let mut groups = self.resolve_omics(omics, spec)?;
            if groups.is_empty() {
                tracing::warn!(omics = %omics, "no files matched");
                continue;
            }
            if let Some(policy) = spec.keep_samples_from_same_case {
                groups = keep_samples_from_same_case(&groups, policy, &self.settings.barcode);
            }
            if spec.sample_types_for_cases_intersection {
                groups = combine_cases_across_groups(&groups, CaseCombine::Intersection);
            }
            cohort.groups.insert(omics, groups);
        }

        if spec.omics_types_for_cases_intersection {
            cohort.groups = intersect_cases_across_omics(&cohort.groups);
        }

        if !spec.sample_types_for_separated_integration {
            for groups in cohort.groups.values_mut() {
                *groups = merge_groups(groups);
            }
        }

        for (omics, groups) in cohort.groups.iter_mut() {
            if !omics.has_sample_groups() {
                let merged = Predicate::concat(groups.values());
                *groups = BTreeMap::from([(ALL_GROUP.to_string(), merged)]);
            }
        }

        tracing::info!(groups = cohort.len(), "filter compiled");
        Ok(cohort)
    }

    fn validate(&self, spec: &FilterSpec) -> Result<(), KiraError> {
        if !spec.uses_cohort_options() {
            return Ok(());
        }
        match spec
            .project_ids
            .iter()
            .find(|project| !self.settings.is_cohort_project(project))
        {
            Some(project) => Err(KiraError::IneligibleProject {
                project: project.clone(),
                prefix: self.settings.cohort_prefix.clone(),
            }),
            None => Ok(()),
        }
    }

    fn resolve_omics(&self, omics: OmicsType, spec: &FilterSpec) -> Result<GroupPredicates, KiraError> {
        let mut base = omics
            .base_predicate()
            .with_field(ACCESS, vec![self.settings.access.clone()]);
        if !spec.project_ids.is_empty() {
            base = base.with_field(PROJECT_ID, spec.project_ids.clone());
        }
        if !spec.case_ids.is_empty() {
            base = base.with_field(CASE_ID, spec.case_ids.clone());
        }

        let answer = self.catalog.query_files(&base)?;
        let barcodes = answer.info()?.barcodes();
        tracing::debug!(omics = %omics, barcodes = barcodes.len(), "data-type resolved");

        let layout = &self.settings.barcode;
        let aliquots = sets::group_by_span(&barcodes, layout.category, layout.aliquot);
        let samples = sets::group_by_span(&barcodes, layout.category, layout.sample);
        let cases = sets::group_by_span(&barcodes, layout.category, layout.case);

        let mut groups = GroupPredicates::new();
        for (category, aliquot_ids) in aliquots {
            if !spec.sample_type_ids.is_empty() && !spec.sample_type_ids.contains(&category) {
                continue;
            }
            let predicate = base
                .with_field(ALIQUOT_ID, aliquot_ids)
                .with_field(SAMPLE_TYPE_ID, vec![category.clone()])
                .with_field(SAMPLE_ID, samples.get(&category).cloned().unwrap_or_default())
                .with_field(CASE_ID, cases.get(&category).cloned().unwrap_or_default());
            groups.insert(category, predicate);
        }
        tracing::debug!(
            omics = %omics,
            categories = ?groups.keys().collect::<Vec<_>>(),
            "sample categories found"
        );
        Ok(groups)
    }
}

pub fn keep_samples_from_same_case(
    groups: &GroupPredicates,
    policy: PickPolicy,
    layout: &BarcodeLayout,
) -> GroupPredicates {
    if policy == PickPolicy::All {
        return groups.clone();
    }
    groups
        .iter()
        .map(|(category, predicate)| {
            let samples = sets::distinct_spans(predicate.values(SAMPLE_ID), layout.sample);
            let sample_cases = samples
                .iter()
                .map(|sample| layout.case.slice(sample).to_string())
                .collect::<Vec<_>>();
            let kept_cases = sets::pick_by_policy(&sample_cases, policy);

            let mut aliquots = predicate.values(ALIQUOT_ID).to_vec();
            aliquots.sort();
            let mut picked_samples = Vec::with_capacity(kept_cases.len());
            let mut picked_aliquots = Vec::with_capacity(kept_cases.len());
            for case in &kept_cases {
                let Some(sample) = samples
                    .iter()
                    .find(|sample| layout.case.slice(sample) == case.as_str())
                else {
                    continue;
                };
                if let Some(aliquot) = aliquots
                    .iter()
                    .find(|aliquot| layout.sample.slice(aliquot) == sample.as_str())
                {
                    picked_samples.push(sample.clone());
                    picked_aliquots.push(aliquot.clone());
                }
            }
            let picked_cases = sets::distinct_spans(&picked_aliquots, layout.case);

            let narrowed = predicate
                .with_field(ALIQUOT_ID, picked_aliquots)
                .with_field(SAMPLE_ID, picked_samples)
                .with_field(CASE_ID, picked_cases);
            (category.clone(), narrowed)
        })
        .collect()
}

pub fn combine_cases_across_groups(groups: &GroupPredicates, mode: CaseCombine) -> GroupPredicates {
    let case_sets = groups
        .iter()
        .map(|(group, predicate)| (group.as_str(), predicate.values(CASE_ID).to_vec()))
        .collect::<BTreeMap<_, _>>();
    let combined = match mode {
        CaseCombine::Intersection => sets::intersection(&case_sets),
        CaseCombine::Union => sets::union(&case_sets),
    };
    groups
        .iter()
        .map(|(group, predicate)| (group.clone(), predicate.with_field(CASE_ID, combined.clone())))
        .collect()
}

/// Restricts each sample category's cases to those present in that category
/// for every data-type carrying it. Runs after all data-types are resolved.
pub fn intersect_cases_across_omics(
    cohort: &BTreeMap<OmicsType, GroupPredicates>,
) -> BTreeMap<OmicsType, GroupPredicates> {
    let mut by_group = BTreeMap::<&str, BTreeMap<OmicsType, Vec<String>>>::new();
    for (omics, groups) in cohort {
        for (group, predicate) in groups {
            by_group
                .entry(group.as_str())
                .or_default()
                .insert(*omics, predicate.values(CASE_ID).to_vec());
        }
    }
    let shared = by_group
        .iter()
        .map(|(group, case_sets)| (*group, sets::intersection(case_sets)))
        .collect::<BTreeMap<_, _>>();

    cohort
        .iter()
        .map(|(omics, groups)| {
            let rewritten = groups
                .iter()
                .map(|(group, predicate)| {
                    let cases = shared.get(group.as_str()).cloned().unwrap_or_default();
                    (group.clone(), predicate.with_field(CASE_ID, cases))
                })
                .collect();
            (*omics, rewritten)
        })
        .collect()
}

pub fn merge_groups(groups: &GroupPredicates) -> GroupPredicates {
    if groups.len() < 2 {
        return groups.clone();
    }
    let label = groups.keys().cloned().collect::<Vec<_>>().join("_");
    let merged = Predicate::concat(groups.values());
    tracing::debug!(label = %label, "sample groups merged");
    BTreeMap::from([(label, merged)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(cases: &[&str]) -> Predicate {
        Predicate::from_fields([(CASE_ID, cases.to_vec())])
    }

    #[test]
    fn union_combine_keeps_every_case() {
        let groups = GroupPredicates::from([
            ("01".to_string(), group(&["TCGA-A1-A0SB", "TCGA-A2-A0T0"])),
            ("11".to_string(), group(&["TCGA-A1-A0SB"])),
        ]);
        let combined = combine_cases_across_groups(&groups, CaseCombine::Union);
        assert_eq!(combined["11"].values(CASE_ID).len(), 2);
        let combined = combine_cases_across_groups(&groups, CaseCombine::Intersection);
        assert_eq!(combined["01"].values(CASE_ID).to_vec(), vec!["TCGA-A1-A0SB".to_string()]);
    }

    #[test]
    fn single_group_is_not_relabelled() {
        let groups = GroupPredicates::from([("01".to_string(), group(&["TCGA-A1-A0SB"]))]);
        let merged = merge_groups(&groups);
        assert!(merged.contains_key("01"));
    }
}
