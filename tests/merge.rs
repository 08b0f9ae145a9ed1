use std::collections::BTreeMap;

use assert_matches::assert_matches;

use kira_omics::domain::OmicsType;
use kira_omics::error::KiraError;
use kira_omics::merge::{STACKED_CNV_GENE, integrate, merge_somatic, parse_source_table};

fn sources(omics: OmicsType, files: &[(&str, &str)]) -> BTreeMap<String, kira_omics::table::KeyedTable> {
    files
        .iter()
        .map(|(label, text)| (label.to_string(), parse_source_table(omics, text).unwrap()))
        .collect()
}

#[test]
fn expression_files_merge_into_one_matrix() {
    let omics = OmicsType::GeneHtseqFpkm;
    let input = sources(
        omics,
        &[
            ("TCGA-BRCA___TCGA-A1-A0SB-01A-11R-A144-07___f1", "ENSG01\t1.5\nENSG02\t2.0\n"),
            ("TCGA-BRCA___TCGA-A2-A0T0-01A-21R-A084-07___f2", "ENSG01\t0.5\nENSG03\t9\n"),
        ],
    );
    let matrices = integrate(omics, &input, "NA").unwrap();
    let matrix = &matrices["FPKM"];
    assert_eq!(
        matrix.header,
        [
            "Id",
            "TCGA-BRCA___TCGA-A1-A0SB-01A-11R-A144-07___f1",
            "TCGA-BRCA___TCGA-A2-A0T0-01A-21R-A084-07___f2"
        ]
    );
    assert_eq!(matrix.rows[0], ["ENSG01", "1.5", "0.5"]);
    assert_eq!(matrix.rows[1], ["ENSG02", "2.0", "NA"]);
    assert_eq!(matrix.rows[2], ["ENSG03", "NA", "9"]);
}

#[test]
fn htseq_counts_drop_housekeeping_rows() {
    let omics = OmicsType::GeneHtseqCounts;
    let table = parse_source_table(omics, "ENSG01\t10\n__no_feature\t3\n__ambiguous\t1\n").unwrap();
    assert_eq!(table.row_keys(), ["ENSG01"]);
}

#[test]
fn mirna_files_give_three_matrices() {
    let omics = OmicsType::Mir;
    let text = "miRNA_ID\tread_count\treads_per_million_miRNA_mapped\tcross-mapped\nhsa-let-7a-1\t100\t2.5\tN\n";
    let matrices = integrate(omics, &sources(omics, &[("TCGA-BRCA___X___m1", text)]), "NA").unwrap();
    assert_eq!(
        matrices.keys().collect::<Vec<_>>(),
        ["CrossMapped", "ReadCount", "ReadsPerMillionMirMapped"]
    );
    assert_eq!(matrices["ReadCount"].rows[0], ["hsa-let-7a-1", "100"]);
}

#[test]
fn missing_value_column_is_fatal() {
    let omics = OmicsType::GeneStarCounts;
    let text = "gene_id\tgene_name\tstranded_first\nENSG01\tTP53\t4\n";
    let err = integrate(omics, &sources(omics, &[("TCGA-BRCA___X___s1", text)]), "NA").unwrap_err();
    assert_matches!(err, KiraError::MissingValueColumn { column, .. } if column == "unstranded");
}

#[test]
fn copy_number_genes_stack_by_file() {
    let omics = OmicsType::CnvGene;
    let input = sources(
        omics,
        &[
            (
                "TCGA-BRCA___2___g1",
                "Gene Symbol\tGene ID\tCytoband\tTCGA-BRCA___TCGA-A1-A0SB-01A\n\
                 ENSG01\t1\t1p36\t0\nENSG02\t2\t1p35\t1\n",
            ),
            (
                "TCGA-LUAD___1___g2",
                "Gene Symbol\tGene ID\tCytoband\tTCGA-LUAD___TCGA-05-4244-01A\nENSG01\t1\t1p36\t-1\n",
            ),
        ],
    );
    let matrices = integrate(omics, &input, "NA").unwrap();
    let matrix = &matrices[STACKED_CNV_GENE];
    assert_eq!(
        matrix.header,
        ["Id", "TCGA-BRCA___TCGA-A1-A0SB-01A___g1", "TCGA-LUAD___TCGA-05-4244-01A___g2"]
    );
    assert_eq!(matrix.rows[0], ["ENSG01", "0", "-1"]);
    assert_eq!(matrix.rows[1], ["ENSG02", "1", "NA"]);
}

#[test]
fn copy_number_column_in_two_files_is_fatal() {
    let omics = OmicsType::CnvGene;
    let text = "Gene Symbol\tGene ID\tCytoband\tsame\nENSG01\t1\t1p36\t0\n";
    let input = sources(omics, &[("P___1___g1", text), ("P___1___g2", text)]);
    assert_matches!(integrate(omics, &input, "NA"), Err(KiraError::DuplicateKey(key)) if key == "same");
}

#[test]
fn mutation_files_stack_with_prefix() {
    let header = "Hugo_Symbol\tChromosome";
    let files = BTreeMap::from([
        (
            "f1/TCGA.BRCA.mutect.f1.DR-10.0.somatic.maf.gz".to_string(),
            format!("#version 2.4\n{header}\nTP53\tchr17\n"),
        ),
        (
            "f2/TCGA.LUAD.muse.f2.DR-10.0.somatic.maf.gz".to_string(),
            format!("{header}\nKRAS\tchr12\n"),
        ),
    ]);
    let matrix = merge_somatic(&files).unwrap();
    assert_eq!(
        matrix.header,
        ["file_id", "project_id", "calling_pipeline", "Hugo_Symbol", "Chromosome"]
    );
    assert_eq!(matrix.rows[0], ["f1", "TCGA-BRCA", "mutect", "TP53", "chr17"]);
    assert_eq!(matrix.rows[1], ["f2", "TCGA-LUAD", "muse", "KRAS", "chr12"]);
}

#[test]
fn blank_lines_before_comments_do_not_hide_the_header() {
    let files = BTreeMap::from([(
        "f1/TCGA.BRCA.mutect.f1.DR-10.0.somatic.maf.gz".to_string(),
        "\n#version 2.4\n\n#filedate 20180101\nHugo_Symbol\tChromosome\nTP53\tchr17\n".to_string(),
    )]);
    let matrix = merge_somatic(&files).unwrap();
    assert_eq!(matrix.header[3..], ["Hugo_Symbol", "Chromosome"]);
    assert_eq!(matrix.rows, vec![vec!["f1", "TCGA-BRCA", "mutect", "TP53", "chr17"]]);
}

#[test]
fn mutation_headers_must_agree() {
    let files = BTreeMap::from([
        ("a/TCGA.BRCA.mutect.a.maf.gz".to_string(), "Hugo_Symbol\tChromosome\n".to_string()),
        ("b/TCGA.BRCA.mutect.b.maf.gz".to_string(), "Hugo_Symbol\n".to_string()),
    ]);
    assert_matches!(merge_somatic(&files), Err(KiraError::HeaderMismatch(name)) if name.starts_with("b/"));
}
