use std::fs;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::Serialize;

use crate::domain::OmicsType;
use crate::error::KiraError;
use crate::sets::PickPolicy;

pub const OMICS_TYPE: &str = "omics_type";
pub const PROJECT_ID: &str = "project_id";
pub const CASE_ID: &str = "case_id";
pub const SAMPLE_TYPE_ID: &str = "sample_type_id";
pub const SAMPLE_TYPES_FOR_CASES_INTERSECTION: &str = "sample_types_for_cases_intersection";
pub const SAMPLE_TYPES_FOR_SEPARATED_INTEGRATION: &str = "sample_types_for_separated_integration";
pub const OMICS_TYPES_FOR_CASES_INTERSECTION: &str = "omics_types_for_cases_intersection";
pub const KEEP_SAMPLES_FROM_SAME_CASE: &str = "keep_samples_from_same_case";

pub const SAMPLE_TYPE_IDS: [&str; 19] = [
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "20",
    "40", "50", "60", "61",
];

const BOOLEAN_VALUES: [&str; 4] = ["t", "true", "f", "false"];

const VALUE_REQUIRED: [&str; 6] = [
    OMICS_TYPE,
    PROJECT_ID,
    SAMPLE_TYPES_FOR_CASES_INTERSECTION,
    SAMPLE_TYPES_FOR_SEPARATED_INTEGRATION,
    OMICS_TYPES_FOR_CASES_INTERSECTION,
    KEEP_SAMPLES_FROM_SAME_CASE,
];

const PROJECT_PATTERN: &str = r"^[A-Z0-9.]+-[A-Z0-9.\-]+$";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub omics_types: Vec<OmicsType>,
    pub project_ids: Vec<String>,
    pub case_ids: Vec<String>,
    pub sample_type_ids: Vec<String>,
    pub sample_types_for_cases_intersection: bool,
    pub sample_types_for_separated_integration: bool,
    pub omics_types_for_cases_intersection: bool,
    pub keep_samples_from_same_case: Option<PickPolicy>,
}

impl FilterSpec {
    pub fn from_path(path: &Path) -> Result<Self, KiraError> {
        let text = fs::read_to_string(path)
            .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
        Self::parse(&text)
    }

    /// Parses `field = value,value` lines. Blank and `#` lines are skipped;
    /// a repeated field replaces the earlier one. A line without `=` has no value.
    pub fn parse(text: &str) -> Result<Self, KiraError> {
        let mut spec = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split('=');
            let field = parts.next().unwrap_or_default().trim().to_lowercase();
            let value = parts.next().unwrap_or_default();
            if parts.next().is_some() {
                return Err(KiraError::FilterFormat {
                    line: index + 1,
                    content: raw.to_string(),
                });
            }
            if field.is_empty() {
                continue;
            }
            spec.apply(&field, split_values(value))?;
        }
        Ok(spec)
    }

    fn apply(&mut self, field: &str, values: Vec<String>) -> Result<(), KiraError> {
        if values.is_empty() && VALUE_REQUIRED.contains(&field) {
            return Err(KiraError::EmptyFilterValue(field.to_string()));
        }
        match field {
            OMICS_TYPE => {
                self.omics_types = values
                    .iter()
                    .map(|value| value.to_lowercase().parse())
                    .collect::<Result<_, _>>()?;
            }
            PROJECT_ID => {
                let pattern = Regex::new(PROJECT_PATTERN)
                    .map_err(|err| KiraError::InvalidProjectId(err.to_string()))?;
                self.project_ids = values
                    .into_iter()
                    .map(|value| {
                        let project = value.to_uppercase();
                        if pattern.is_match(&project) {
                            Ok(project)
                        } else {
                            Err(KiraError::InvalidProjectId(project))
                        }
                    })
                    .collect::<Result<_, _>>()?;
            }
            CASE_ID => {
                self.case_ids = values.into_iter().map(|value| value.to_uppercase()).collect();
            }
            SAMPLE_TYPE_ID => {
                self.sample_type_ids = values
                    .into_iter()
                    .map(|value| check_vocabulary(field, value.to_lowercase(), &SAMPLE_TYPE_IDS))
                    .collect::<Result<_, _>>()?;
            }
            SAMPLE_TYPES_FOR_CASES_INTERSECTION => {
                self.sample_types_for_cases_intersection = parse_flag(field, &values)?;
            }
            SAMPLE_TYPES_FOR_SEPARATED_INTEGRATION => {
                self.sample_types_for_separated_integration = parse_flag(field, &values)?;
            }
            OMICS_TYPES_FOR_CASES_INTERSECTION => {
                self.omics_types_for_cases_intersection = parse_flag(field, &values)?;
            }
            KEEP_SAMPLES_FROM_SAME_CASE => {
                let mut policy = None;
                for value in &values {
                    policy = match value.parse::<PickPolicy>()? {
                        PickPolicy::All => None,
                        other => Some(other),
                    };
                }
                self.keep_samples_from_same_case = policy;
            }
            other => return Err(KiraError::UnknownFilterField(other.to_string())),
        }
        Ok(())
    }

    pub fn uses_cohort_options(&self) -> bool {
        !self.sample_type_ids.is_empty()
            || self.sample_types_for_cases_intersection
            || self.sample_types_for_separated_integration
            || self.omics_types_for_cases_intersection
            || self.keep_samples_from_same_case.is_some()
    }
}

impl FromStr for FilterSpec {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn split_values(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_matches(',')
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_vocabulary(field: &str, value: String, allowed: &[&str]) -> Result<String, KiraError> {
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(KiraError::InvalidFilterValue {
            field: field.to_string(),
            value,
            expected: format!("[{}]", allowed.join(" ")),
        })
    }
}

fn parse_flag(field: &str, values: &[String]) -> Result<bool, KiraError> {
    let mut flag = false;
    for value in values {
        let value = check_vocabulary(field, value.to_lowercase(), &BOOLEAN_VALUES)?;
        flag = value == "t" || value == "true";
    }
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn values_are_normalized() {
        let spec = FilterSpec::parse("project_id = tcga-brca, tcga-luad,\ncase_id = tcga-a1-a0sb\n")
            .unwrap();
        assert_eq!(spec.project_ids, vec!["TCGA-BRCA", "TCGA-LUAD"]);
        assert_eq!(spec.case_ids, vec!["TCGA-A1-A0SB"]);
    }

    #[test]
    fn second_equals_sign_is_fatal() {
        let err = FilterSpec::parse("omics_type = mir = mir_isoform").unwrap_err();
        assert_matches!(err, KiraError::FilterFormat { line: 1, .. });
    }

    #[test]
    fn bare_flag_line_is_fatal() {
        let err = FilterSpec::parse("sample_types_for_cases_intersection\n").unwrap_err();
        assert_matches!(err, KiraError::EmptyFilterValue(field) if field == SAMPLE_TYPES_FOR_CASES_INTERSECTION);
    }

    #[test]
    fn all_means_unset() {
        let spec = FilterSpec::parse("keep_samples_from_same_case = all").unwrap();
        assert_eq!(spec.keep_samples_from_same_case, None);
        assert!(!spec.uses_cohort_options());
    }
}
