use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KiraError;
use crate::predicate::Predicate;
use crate::table::DimOrder;

pub const ALL_GROUP: &str = "all";

pub const DEFAULT_ID_LABEL: &str = "Id";

pub const METHYLATION_ID_LABEL: &str = "CGcluster#Chr#Start#End#GeneSymbol#GeneType#TranscriptID#PositionToTSS#CGIcoordinate#FeatureType";

pub const KEY_SEPARATOR: &str = "___";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OmicsType {
    #[serde(rename = "cnv_segment_somatic_only")]
    CnvSegmentSomaticOnly,
    #[serde(rename = "cnv_segment_somatic_and_germline")]
    CnvSegmentSomaticAndGermline,
    #[serde(rename = "cnv_gene")]
    CnvGene,
    #[serde(rename = "gene_htseq_fpkm_uq")]
    GeneHtseqFpkmUq,
    #[serde(rename = "gene_htseq_fpkm")]
    GeneHtseqFpkm,
    #[serde(rename = "gene_htseq_counts")]
    GeneHtseqCounts,
    #[serde(rename = "gene_star_counts")]
    GeneStarCounts,
    #[serde(rename = "methy_27")]
    Methy27,
    #[serde(rename = "methy_450")]
    Methy450,
    #[serde(rename = "mir")]
    Mir,
    #[serde(rename = "mir_isoform")]
    MirIsoform,
    #[serde(rename = "somatic_mutation")]
    SomaticMutation,
}

#[derive(Debug, Clone, Copy)]
pub struct ParseRecipe {
    pub header: Option<&'static [&'static str]>,
    pub unite: &'static [usize],
    pub skip_rows: &'static [&'static str],
    pub skip_columns: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueColumn {
    pub output: &'static str,
    pub source: &'static str,
}

const fn column(output: &'static str, source: &'static str) -> ValueColumn {
    ValueColumn { output, source }
}

const NO_SKIP: &[&str] = &[];

impl OmicsType {
    pub const ALL: [OmicsType; 12] = [
        OmicsType::CnvSegmentSomaticOnly,
        OmicsType::CnvSegmentSomaticAndGermline,
        OmicsType::CnvGene,
        OmicsType::GeneHtseqFpkmUq,
        OmicsType::GeneHtseqFpkm,
        OmicsType::GeneHtseqCounts,
        OmicsType::GeneStarCounts,
        OmicsType::Methy27,
        OmicsType::Methy450,
        OmicsType::Mir,
        OmicsType::MirIsoform,
        OmicsType::SomaticMutation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OmicsType::CnvSegmentSomaticOnly => "cnv_segment_somatic_only",
            OmicsType::CnvSegmentSomaticAndGermline => "cnv_segment_somatic_and_germline",
            OmicsType::CnvGene => "cnv_gene",
            OmicsType::GeneHtseqFpkmUq => "gene_htseq_fpkm_uq",
            OmicsType::GeneHtseqFpkm => "gene_htseq_fpkm",
            OmicsType::GeneHtseqCounts => "gene_htseq_counts",
            OmicsType::GeneStarCounts => "gene_star_counts",
            OmicsType::Methy27 => "methy_27",
            OmicsType::Methy450 => "methy_450",
            OmicsType::Mir => "mir",
            OmicsType::MirIsoform => "mir_isoform",
            OmicsType::SomaticMutation => "somatic_mutation",
        }
    }

    pub fn has_sample_groups(&self) -> bool {
        !matches!(self, OmicsType::CnvGene | OmicsType::SomaticMutation)
    }

    pub fn base_predicate(&self) -> Predicate {
        match self {
            OmicsType::CnvSegmentSomaticOnly
            | OmicsType::CnvSegmentSomaticAndGermline
            | OmicsType::CnvGene => {
                let data_type = match self {
                    OmicsType::CnvGene => "Gene Level Copy Number Scores",
                    OmicsType::CnvSegmentSomaticAndGermline => "Copy Number Segment",
                    _ => "Masked Copy Number Segment",
                };
                Predicate::from_fields([
                    ("data_category", vec!["Copy Number Variation"]),
                    ("experimental_strategy", vec!["Genotyping Array"]),
                    ("data_type", vec![data_type]),
                    ("type", vec!["copy_number_segment", "copy_number_estimate"]),
                    ("platform", vec!["Affymetrix SNP 6.0"]),
                ])
            }
            OmicsType::GeneHtseqFpkmUq
            | OmicsType::GeneHtseqFpkm
            | OmicsType::GeneHtseqCounts
            | OmicsType::GeneStarCounts => {
                let workflow = match self {
                    OmicsType::GeneHtseqFpkmUq => "HTSeq - FPKM-UQ",
                    OmicsType::GeneHtseqFpkm => "HTSeq - FPKM",
                    OmicsType::GeneHtseqCounts => "HTSeq - Counts",
                    _ => "STAR - Counts",
                };
                Predicate::from_fields([
                    ("data_category", vec!["Transcriptome Profiling"]),
                    (
                        "data_type",
                        vec![
                            "Gene Expression Quantification",
                            "Splice Junction Quantification",
                        ],
                    ),
                    ("type", vec!["gene_expression"]),
                    ("experimental_strategy", vec!["RNA-Seq"]),
                    ("analysis.workflow_type", vec![workflow]),
                ])
            }
            OmicsType::Methy27 | OmicsType::Methy450 => {
                let platform = match self {
                    OmicsType::Methy27 => "Illumina Human Methylation 27",
                    _ => "Illumina Human Methylation 450",
                };
                Predicate::from_fields([
                    ("data_category", vec!["DNA Methylation"]),
                    ("data_type", vec!["Methylation Beta Value"]),
                    ("experimental_strategy", vec!["Methylation Array"]),
                    ("type", vec!["methylation_beta_value"]),
                    ("platform", vec![platform]),
                ])
            }
            OmicsType::Mir | OmicsType::MirIsoform => {
                let data_type = match self {
                    OmicsType::Mir => "miRNA Expression Quantification",
                    _ => "Isoform Expression Quantification",
                };
                Predicate::from_fields([
                    ("data_category", vec!["Transcriptome Profiling"]),
                    ("data_type", vec![data_type]),
                    ("experimental_strategy", vec!["miRNA-Seq"]),
                    ("type", vec!["mirna_expression"]),
                ])
            }
            OmicsType::SomaticMutation => Predicate::from_fields([
                ("data_category", vec!["Simple Nucleotide Variation"]),
                ("experimental_strategy", vec!["Targeted Sequencing", "WXS"]),
                ("data_format", vec!["MAF", "VCF"]),
                (
                    "data_type",
                    vec![
                        "Aggregated Somatic Mutation",
                        "Annotated Somatic Mutation",
                        "Masked Somatic Mutation",
                        "Raw Simple Somatic Mutation",
                    ],
                ),
                (
                    "type",
                    vec![
                        "aggregated_somatic_mutation",
                        "annotated_somatic_mutation",
                        "masked_somatic_mutation",
                        "simple_somatic_mutation",
                    ],
                ),
            ]),
        }
    }

    pub fn parse_recipe(&self) -> ParseRecipe {
        match self {
            OmicsType::CnvSegmentSomaticOnly | OmicsType::CnvSegmentSomaticAndGermline => {
                ParseRecipe {
                    header: None,
                    unite: &[1, 2, 3],
                    skip_rows: NO_SKIP,
                    skip_columns: &["GDC_Aliquot", "Num_Probes"],
                }
            }
            OmicsType::CnvGene => ParseRecipe {
                header: None,
                unite: &[],
                skip_rows: NO_SKIP,
                skip_columns: &["Gene ID", "Cytoband"],
            },
            OmicsType::GeneHtseqFpkmUq => ParseRecipe {
                header: Some(&["Gene", "FPKMUQ"]),
                unite: &[],
                skip_rows: NO_SKIP,
                skip_columns: NO_SKIP,
            },
            OmicsType::GeneHtseqFpkm => ParseRecipe {
                header: Some(&["Gene", "FPKM"]),
                unite: &[],
                skip_rows: NO_SKIP,
                skip_columns: NO_SKIP,
            },
            OmicsType::GeneHtseqCounts => ParseRecipe {
                header: Some(&["Gene", "ReadCount"]),
                unite: &[],
                skip_rows: &[
                    "__no_feature",
                    "__ambiguous",
                    "__too_low_aQual",
                    "__not_aligned",
                    "__alignment_not_unique",
                ],
                skip_columns: NO_SKIP,
            },
            OmicsType::GeneStarCounts => ParseRecipe {
                header: None,
                unite: &[],
                skip_rows: &["N_unmapped", "N_multimapping", "N_noFeature", "N_ambiguous"],
                skip_columns: &["stranded_first", "stranded_second"],
            },
            OmicsType::Methy27 | OmicsType::Methy450 => ParseRecipe {
                header: None,
                unite: &[0, 2, 3, 4, 5, 6, 7, 8, 9, 10],
                skip_rows: NO_SKIP,
                skip_columns: NO_SKIP,
            },
            OmicsType::Mir => ParseRecipe {
                header: None,
                unite: &[],
                skip_rows: NO_SKIP,
                skip_columns: NO_SKIP,
            },
            OmicsType::MirIsoform => ParseRecipe {
                header: None,
                unite: &[0, 1, 5],
                skip_rows: NO_SKIP,
                skip_columns: NO_SKIP,
            },
            OmicsType::SomaticMutation => ParseRecipe {
                header: None,
                unite: &[],
                skip_rows: NO_SKIP,
                skip_columns: NO_SKIP,
            },
        }
    }

    pub fn value_columns(&self) -> &'static [ValueColumn] {
        const SEGMENT: &[ValueColumn] = &[column("SegmentMean", "Segment_Mean")];
        const FPKM_UQ: &[ValueColumn] = &[column("FPKMUQ", "FPKMUQ")];
        const FPKM: &[ValueColumn] = &[column("FPKM", "FPKM")];
        const HTSEQ_COUNTS: &[ValueColumn] = &[column("ReadCount", "ReadCount")];
        const STAR_COUNTS: &[ValueColumn] = &[column("ReadCount", "unstranded")];
        const BETA: &[ValueColumn] = &[column("BetaValue", "Beta_value")];
        const MIRNA: &[ValueColumn] = &[
            column("ReadCount", "read_count"),
            column("ReadsPerMillionMirMapped", "reads_per_million_miRNA_mapped"),
            column("CrossMapped", "cross-mapped"),
        ];
        match self {
            OmicsType::CnvSegmentSomaticOnly | OmicsType::CnvSegmentSomaticAndGermline => SEGMENT,
            OmicsType::GeneHtseqFpkmUq => FPKM_UQ,
            OmicsType::GeneHtseqFpkm => FPKM,
            OmicsType::GeneHtseqCounts => HTSEQ_COUNTS,
            OmicsType::GeneStarCounts => STAR_COUNTS,
            OmicsType::Methy27 | OmicsType::Methy450 => BETA,
            OmicsType::Mir | OmicsType::MirIsoform => MIRNA,
            OmicsType::CnvGene | OmicsType::SomaticMutation => &[],
        }
    }

    pub fn id_label(&self) -> &'static str {
        match self {
            OmicsType::Methy27 | OmicsType::Methy450 => METHYLATION_ID_LABEL,
            _ => DEFAULT_ID_LABEL,
        }
    }

    pub fn output_order(&self) -> DimOrder {
        match self {
            OmicsType::CnvGene => DimOrder::ColumnsFirst,
            _ => DimOrder::RowsFirst,
        }
    }

    pub fn from_file_name(name: &str) -> Option<OmicsType> {
        if name.ends_with(".focal_score_by_genes.txt") {
            Some(OmicsType::CnvGene)
        } else if name.ends_with(".nocnv_grch38.seg.v2.txt") {
            Some(OmicsType::CnvSegmentSomaticOnly)
        } else if name.ends_with(".grch38.seg.v2.txt") {
            Some(OmicsType::CnvSegmentSomaticAndGermline)
        } else if name.ends_with(".FPKM-UQ.txt.gz") {
            Some(OmicsType::GeneHtseqFpkmUq)
        } else if name.ends_with(".FPKM.txt.gz") {
            Some(OmicsType::GeneHtseqFpkm)
        } else if name.ends_with(".htseq.counts.gz") || name.ends_with(".htseq_counts.txt.gz") {
            Some(OmicsType::GeneHtseqCounts)
        } else if name.ends_with(".rna_seq.star_gene_counts.tsv.gz") {
            Some(OmicsType::GeneStarCounts)
        } else if name.contains(".HumanMethylation450.") {
            Some(OmicsType::Methy450)
        } else if name.contains(".HumanMethylation27.") {
            Some(OmicsType::Methy27)
        } else if name.ends_with(".mirbase21.mirnas.quantification.txt")
            || name.ends_with(".mirnaseq.mirnas.quantification.txt")
        {
            Some(OmicsType::Mir)
        } else if name.ends_with(".mirbase21.isoforms.quantification.txt")
            || name.ends_with(".mirnaseq.isoforms.quantification.txt")
        {
            Some(OmicsType::MirIsoform)
        } else if name.ends_with(".DR-10.0.somatic.maf.gz") {
            Some(OmicsType::SomaticMutation)
        } else {
            None
        }
    }
}

impl fmt::Display for OmicsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OmicsType {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        OmicsType::ALL
            .into_iter()
            .find(|omics| omics.as_str() == normalized)
            .ok_or_else(|| KiraError::UnknownOmicsType(value.to_string()))
    }
}
