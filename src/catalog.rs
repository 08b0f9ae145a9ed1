use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::config::BarcodeLayout;
use crate::domain::{ALL_GROUP, KEY_SEPARATOR, OmicsType};
use crate::error::KiraError;
use crate::predicate::Predicate;
use crate::table::KeyedTable;

pub trait CatalogQuery: Send + Sync {
    fn query_files(&self, predicate: &Predicate) -> Result<CatalogAnswer, KiraError>;

    fn query_cases(&self, case_ids: &[String]) -> Result<Value, KiraError>;
}

pub trait FileDownload {
    fn download(&self, file_ids: &[String]) -> Result<Vec<u8>, KiraError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CatalogAnswer {
    raw: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerInfo {
    pub file_ids: Vec<String>,
    /// `file_id/file_name` to `project___barcode`, or `project___<aliquot count>`.
    pub file_labels: BTreeMap<String, String>,
    pub aliquot_barcodes: BTreeMap<String, String>,
    pub barcode_projects: BTreeMap<String, String>,
}

impl AnswerInfo {
    pub fn barcodes(&self) -> Vec<String> {
        self.barcode_projects.keys().cloned().collect()
    }

    pub fn projects(&self) -> Vec<String> {
        self.barcode_projects
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl CatalogAnswer {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KiraError> {
        let raw = serde_json::from_slice(bytes)
            .map_err(|err| KiraError::MalformedAnswer(err.to_string()))?;
        Ok(Self { raw })
    }

    pub fn hits(&self) -> &[Value] {
        self.raw
            .pointer("/data/hits")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn to_vec_pretty(&self) -> Result<Vec<u8>, KiraError> {
        serde_json::to_vec_pretty(&self.raw).map_err(|err| KiraError::MalformedAnswer(err.to_string()))
    }

    pub fn info(&self) -> Result<AnswerInfo, KiraError> {
        let mut info = AnswerInfo::default();
        let mut barcode_owner = BTreeMap::<String, String>::new();

        for hit in self.hits() {
            let file_id = text(hit.get("file_id"));
            let file_name = text(hit.get("file_name"));
            let project = hit
                .pointer("/cases/0/project/project_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            info.file_ids.push(file_id.clone());

            let mut per_file = Vec::<(String, String)>::new();
            for (aliquot, barcode) in aliquots(hit) {
                if let Some(owner) = barcode_owner.get(&barcode) {
                    if *owner != aliquot {
                        return Err(KiraError::DuplicateBarcode { aliquot, barcode });
                    }
                }
                barcode_owner.insert(barcode.clone(), aliquot.clone());
                if !per_file.iter().any(|(seen, _)| *seen == aliquot) {
                    per_file.push((aliquot.clone(), barcode.clone()));
                }
                info.aliquot_barcodes.insert(aliquot, barcode.clone());
                info.barcode_projects.insert(barcode, project.clone());
            }

            let label = match per_file.as_slice() {
                [(_, barcode)] => format!("{project}{KEY_SEPARATOR}{barcode}"),
                many => format!("{project}{KEY_SEPARATOR}{}", many.len()),
            };
            info.file_labels.insert(format!("{file_id}/{file_name}"), label);
        }
        Ok(info)
    }

    pub fn detect_omics_type(&self) -> Result<OmicsType, KiraError> {
        let detected = self
            .hits()
            .iter()
            .filter_map(|hit| hit.get("file_name").and_then(Value::as_str))
            .filter_map(OmicsType::from_file_name)
            .collect::<BTreeSet<_>>();
        let mut iter = detected.iter();
        match (iter.next(), iter.next()) {
            (Some(omics), None) => Ok(*omics),
            (None, _) => Err(KiraError::UndetectedOmicsType),
            _ => Err(KiraError::AmbiguousOmicsType(
                detected
                    .iter()
                    .map(OmicsType::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    pub fn detect_sample_group(
        &self,
        omics: OmicsType,
        layout: &BarcodeLayout,
        cohort_prefix: &str,
    ) -> Result<String, KiraError> {
        if !omics.has_sample_groups() {
            return Ok(ALL_GROUP.to_string());
        }
        let info = self.info()?;
        let categories = info
            .barcode_projects
            .iter()
            .filter(|(_, project)| project.starts_with(cohort_prefix))
            .map(|(barcode, _)| layout.category.slice(barcode).to_string())
            .collect::<BTreeSet<_>>();
        if categories.is_empty() {
            return Ok(ALL_GROUP.to_string());
        }
        Ok(categories.into_iter().collect::<Vec<_>>().join("_"))
    }
}

fn aliquots(hit: &Value) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for case in array(hit, "cases") {
        for sample in array(case, "samples") {
            for portion in array(sample, "portions") {
                for analyte in array(portion, "analytes") {
                    found.extend(
                        array(analyte, "aliquots")
                            .iter()
                            .map(|aliquot| {
                                (text(aliquot.get("aliquot_id")), text(aliquot.get("submitter_id")))
                            })
                            .take_while(|(id, barcode)| !(id.is_empty() && barcode.is_empty())),
                    );
                }
            }
        }
    }
    found
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

const DEMOGRAPHIC_FIELDS: [&str; 10] = [
    "age_at_index",
    "days_to_birth",
    "days_to_death",
    "ethnicity",
    "gender",
    "race",
    "updated_datetime",
    "vital_status",
    "year_of_birth",
    "year_of_death",
];

const DIAGNOSIS_FIELDS: [&str; 23] = [
    "age_at_diagnosis",
    "ajcc_pathologic_m",
    "ajcc_pathologic_n",
    "ajcc_pathologic_stage",
    "ajcc_pathologic_t",
    "ajcc_staging_system_edition",
    "classification_of_tumor",
    "days_to_diagnosis",
    "days_to_last_follow_up",
    "days_to_last_known_disease_status",
    "days_to_recurrence",
    "diagnosis_id",
    "icd_10_code",
    "last_known_disease_status",
    "morphology",
    "primary_diagnosis",
    "prior_malignancy",
    "prior_treatment",
    "progression_or_recurrence",
    "site_of_resection_or_biopsy",
    "synchronous_malignancy",
    "tissue_or_organ_of_origin",
    "updated_datetime",
];

const EXPOSURE_FIELDS: [&str; 10] = [
    "alcohol_history",
    "alcohol_intensity",
    "bmi",
    "cigarettes_per_day",
    "exposure_id",
    "height",
    "pack_years_smoked",
    "updated_datetime",
    "weight",
    "years_smoked",
];

pub fn case_fields() -> Vec<String> {
    let mut fields = [
        "case_id",
        "submitter_id",
        "project.project_id",
        "disease_type",
        "primary_site",
        "updated_datetime",
        "tissue_source_site.tissue_source_site_id",
    ]
    .iter()
    .map(|field| field.to_string())
    .collect::<Vec<_>>();
    fields.extend(DEMOGRAPHIC_FIELDS.iter().map(|field| format!("demographic.{field}")));
    fields.extend(DIAGNOSIS_FIELDS.iter().map(|field| format!("diagnoses.{field}")));
    fields.extend(EXPOSURE_FIELDS.iter().map(|field| format!("exposures.{field}")));
    fields
}

pub fn case_table(cases: &Value) -> Result<KeyedTable, KiraError> {
    let records = cases
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| KiraError::MalformedAnswer("cases answer has no data array".to_string()))?;

    let mut cells = Vec::new();
    for record in records {
        let case = text(record.get("submitter_id"));
        let case_id = text(record.get("case_id"));
        let project = text(record.pointer("/project/project_id"));
        let row = [project.as_str(), case.as_str(), case_id.as_str()].join(KEY_SEPARATOR);

        let mut push = |column: String, value: String| cells.push((row.clone(), column, value));
        for field in DEMOGRAPHIC_FIELDS {
            push(
                format!("demographic-{field}"),
                text(record.get("demographic").and_then(|d| d.get(field))),
            );
        }
        for field in DIAGNOSIS_FIELDS {
            push(
                format!("diagnoses-{field}"),
                text(record.pointer("/diagnoses/0").and_then(|d| d.get(field))),
            );
        }
        for field in EXPOSURE_FIELDS {
            push(
                format!("exposures-{field}"),
                text(record.pointer("/exposures/0").and_then(|e| e.get(field))),
            );
        }
        push("disease_type".to_string(), text(record.get("disease_type")));
        push("primary_site".to_string(), text(record.get("primary_site")));
        push(
            "tissue_source_site_id".to_string(),
            text(record.pointer("/tissue_source_site/tissue_source_site_id")),
        );
        push("updated_datetime".to_string(), text(record.get("updated_datetime")));
        push("project".to_string(), project.clone());
        push("case_id".to_string(), case_id.clone());
        push("case".to_string(), case.clone());
    }
    KeyedTable::from_cells(cells)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn walk_stops_at_first_incomplete_aliquot() {
        let hit = json!({
            "cases": [{
                "samples": [{
                    "portions": [{
                        "analytes": [{
                            "aliquots": [
                                {"aliquot_id": "a1", "submitter_id": "TCGA-A1-A0SB-01A-11R-A144-07"},
                                {"aliquot_id": "", "submitter_id": "x"},
                                {"aliquot_id": "a3", "submitter_id": "TCGA-A1-A0SB-01A-11R-A145-07"}
                            ]
                        }]
                    }]
                }]
            }]
        });
        assert_eq!(aliquots(&hit).len(), 1);
    }

    #[test]
    fn missing_levels_are_empty() {
        assert!(aliquots(&json!({"cases": "oops"})).is_empty());
        assert!(aliquots(&json!({})).is_empty());
    }
}
