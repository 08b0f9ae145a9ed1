#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::{Value, json};

use kira_omics::catalog::{CatalogAnswer, CatalogQuery, FileDownload};
use kira_omics::domain::OmicsType;
use kira_omics::error::KiraError;
use kira_omics::predicate::Predicate;

/// File hit with one case, one sample and the given `(aliquot_id, barcode)` pairs.
pub fn hit(file_id: &str, file_name: &str, project: &str, aliquots: &[(&str, &str)]) -> Value {
    let aliquots = aliquots
        .iter()
        .map(|(id, barcode)| json!({ "aliquot_id": id, "submitter_id": barcode }))
        .collect::<Vec<_>>();
    json!({
        "file_id": file_id,
        "file_name": file_name,
        "cases": [{
            "project": { "project_id": project },
            "samples": [{ "portions": [{ "analytes": [{ "aliquots": aliquots }] }] }]
        }]
    })
}

pub fn answer(hits: Vec<Value>) -> CatalogAnswer {
    let total = hits.len();
    CatalogAnswer::from_value(json!({
        "data": { "hits": hits, "pagination": { "total": total } },
        "warnings": {}
    }))
}

/// In-memory catalog answering each data-type with a fixed answer.
#[derive(Default)]
pub struct MockCatalog {
    pub answers: Vec<(OmicsType, CatalogAnswer)>,
    pub queries: Mutex<Vec<Predicate>>,
    pub case_queries: Mutex<Vec<Vec<String>>>,
}

impl MockCatalog {
    pub fn with(answers: Vec<(OmicsType, CatalogAnswer)>) -> Self {
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn queried(&self) -> Vec<Predicate> {
        self.queries.lock().unwrap().clone()
    }
}

impl CatalogQuery for MockCatalog {
    fn query_files(&self, predicate: &Predicate) -> Result<CatalogAnswer, KiraError> {
        self.queries.lock().unwrap().push(predicate.clone());
        let found = self.answers.iter().find(|(omics, _)| {
            omics
                .base_predicate()
                .fields()
                .all(|(field, values)| values.iter().all(|value| predicate.values(field).contains(value)))
        });
        Ok(found
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| answer(Vec::new())))
    }

    fn query_cases(&self, case_ids: &[String]) -> Result<Value, KiraError> {
        self.case_queries.lock().unwrap().push(case_ids.to_vec());
        let data = case_ids
            .iter()
            .map(|case| {
                json!({
                    "case_id": format!("uuid-{case}"),
                    "submitter_id": case,
                    "project": { "project_id": "TCGA-BRCA" },
                    "primary_site": "Breast",
                    "demographic": { "gender": "female" }
                })
            })
            .collect::<Vec<_>>();
        let count = data.len();
        Ok(json!({ "data": data, "count": count }))
    }
}

pub struct MockDownload {
    pub body: Vec<u8>,
}

impl FileDownload for MockDownload {
    fn download(&self, _file_ids: &[String]) -> Result<Vec<u8>, KiraError> {
        Ok(self.body.clone())
    }
}
