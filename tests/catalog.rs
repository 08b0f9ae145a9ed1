mod common;

use assert_matches::assert_matches;
use serde_json::json;

use kira_omics::catalog::case_table;
use kira_omics::config::BarcodeLayout;
use kira_omics::domain::OmicsType;
use kira_omics::error::KiraError;

use common::{answer, hit};

#[test]
fn answer_info_labels_files() {
    let answer = answer(vec![
        hit("f1", "a.FPKM.txt.gz", "TCGA-BRCA", &[("a1", "TCGA-A1-A0SB-01A-11R-A144-07")]),
        hit(
            "g1",
            "b.FPKM.txt.gz",
            "TCGA-BRCA",
            &[
                ("a2", "TCGA-A2-A0T0-01A-21R-A084-07"),
                ("a3", "TCGA-A2-A0T0-11A-21R-A084-07"),
            ],
        ),
    ]);
    let info = answer.info().unwrap();
    assert_eq!(info.file_ids, vec!["f1", "g1"]);
    assert_eq!(
        info.file_labels["f1/a.FPKM.txt.gz"],
        "TCGA-BRCA___TCGA-A1-A0SB-01A-11R-A144-07"
    );
    assert_eq!(info.file_labels["g1/b.FPKM.txt.gz"], "TCGA-BRCA___2");
    assert_eq!(info.aliquot_barcodes["a3"], "TCGA-A2-A0T0-11A-21R-A084-07");
    assert_eq!(info.projects(), vec!["TCGA-BRCA"]);
    assert_eq!(info.barcodes().len(), 3);
}

#[test]
fn aliquot_walk_stops_only_when_id_and_barcode_are_both_missing() {
    let answer = answer(vec![hit(
        "f1",
        "a.FPKM.txt.gz",
        "TCGA-BRCA",
        &[
            ("a1", ""),
            ("a2", "TCGA-A1-A0SB-01A-11R-A144-07"),
            ("", ""),
            ("a3", "TCGA-A1-A0SB-11A-11R-A144-07"),
        ],
    )]);
    let info = answer.info().unwrap();
    assert_eq!(info.aliquot_barcodes.len(), 2);
    assert_eq!(info.aliquot_barcodes["a1"], "");
    assert_eq!(info.aliquot_barcodes["a2"], "TCGA-A1-A0SB-01A-11R-A144-07");
    assert!(!info.aliquot_barcodes.contains_key("a3"));
    assert_eq!(info.file_labels["f1/a.FPKM.txt.gz"], "TCGA-BRCA___2");
}

#[test]
fn barcode_reused_by_another_aliquot_is_fatal() {
    let answer = answer(vec![
        hit("f1", "a.FPKM.txt.gz", "TCGA-BRCA", &[("a1", "TCGA-A1-A0SB-01A-11R-A144-07")]),
        hit("f2", "b.FPKM.txt.gz", "TCGA-BRCA", &[("a9", "TCGA-A1-A0SB-01A-11R-A144-07")]),
    ]);
    assert_matches!(answer.info(), Err(KiraError::DuplicateBarcode { aliquot, .. }) if aliquot == "a9");
}

#[test]
fn data_type_and_group_detection() {
    let layout = BarcodeLayout::default();
    let expression = answer(vec![
        hit("f1", "a.FPKM.txt.gz", "TCGA-BRCA", &[("a1", "TCGA-A1-A0SB-11A-11R-A144-07")]),
        hit("f2", "b.FPKM.txt.gz", "TCGA-BRCA", &[("a2", "TCGA-A2-A0T0-01A-21R-A084-07")]),
        hit("f3", "c.FPKM.txt.gz", "CPTAC-3", &[("a3", "C3L-00001-01")]),
    ]);
    assert_eq!(expression.detect_omics_type().unwrap(), OmicsType::GeneHtseqFpkm);
    assert_eq!(
        expression.detect_sample_group(OmicsType::GeneHtseqFpkm, &layout, "TCGA-").unwrap(),
        "01_11"
    );

    let mixed = answer(vec![
        hit("f1", "a.FPKM.txt.gz", "TCGA-BRCA", &[]),
        hit("f2", "a.FPKM-UQ.txt.gz", "TCGA-BRCA", &[]),
    ]);
    assert_matches!(mixed.detect_omics_type(), Err(KiraError::AmbiguousOmicsType(_)));
    assert_matches!(answer(vec![]).detect_omics_type(), Err(KiraError::UndetectedOmicsType));

    let genes = answer(vec![hit("g1", "x.focal_score_by_genes.txt", "TCGA-BRCA", &[])]);
    assert_eq!(genes.detect_sample_group(OmicsType::CnvGene, &layout, "TCGA-").unwrap(), "all");
}

#[test]
fn case_records_become_rows() {
    let cases = json!({
        "data": [{
            "case_id": "c-1",
            "submitter_id": "TCGA-A1-A0SB",
            "project": {"project_id": "TCGA-BRCA"},
            "primary_site": "Breast",
            "demographic": {"gender": "female", "year_of_birth": 1960},
            "diagnoses": [{"primary_diagnosis": "Infiltrating duct carcinoma, NOS"}]
        }],
        "count": 1
    });
    let table = case_table(&cases).unwrap();
    let row = "TCGA-BRCA___TCGA-A1-A0SB___c-1";
    assert_eq!(table.get(row, "demographic-gender"), Some("female"));
    assert_eq!(table.get(row, "demographic-year_of_birth"), Some("1960"));
    assert_eq!(
        table.get(row, "diagnoses-primary_diagnosis"),
        Some("Infiltrating duct carcinoma, NOS")
    );
    assert_eq!(table.get(row, "exposures-bmi"), Some(""));
    assert_eq!(table.get(row, "primary_site"), Some("Breast"));

    assert_matches!(case_table(&json!({})), Err(KiraError::MalformedAnswer(_)));
}
