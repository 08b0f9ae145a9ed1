use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{KEY_SEPARATOR, OmicsType};
use crate::error::KiraError;
use crate::table::{AxisOrder, DimOrder, KeyedTable, KeyedTable3, Matrix, RawTable};

pub const STACKED_CNV_GENE: &str = "cnv_gene";

pub const SOMATIC_PREFIX_COLUMNS: [&str; 3] = ["file_id", "project_id", "calling_pipeline"];

pub fn parse_source_table(omics: OmicsType, text: &str) -> Result<KeyedTable, KiraError> {
    if omics == OmicsType::SomaticMutation {
        return Err(KiraError::UnsupportedOmicsType {
            omics: omics.to_string(),
            operation: "table parsing".to_string(),
        });
    }
    let recipe = omics.parse_recipe();
    let mut raw = RawTable::parse(text);
    if let Some(header) = recipe.header {
        raw = raw.with_header(header);
    }
    raw.unite_columns(recipe.unite, KEY_SEPARATOR)?
        .skip(recipe.skip_rows, recipe.skip_columns)
        .into_keyed(DimOrder::RowsFirst)
}

pub fn integrate(
    omics: OmicsType,
    sources: &BTreeMap<String, KeyedTable>,
    missing: &str,
) -> Result<BTreeMap<String, Matrix>, KiraError> {
    match omics {
        OmicsType::SomaticMutation => {
            return Err(KiraError::UnsupportedOmicsType {
                omics: omics.to_string(),
                operation: "table integration".to_string(),
            });
        }
        OmicsType::CnvGene => {
            let matrix = stack_by_source(omics, sources, missing)?;
            return Ok(BTreeMap::from([(STACKED_CNV_GENE.to_string(), matrix)]));
        }
        _ => {}
    }

    let selected = omics
        .value_columns()
        .iter()
        .map(|column| column.source)
        .collect::<Vec<_>>();
    for (label, table) in sources {
        let present = table.column_keys();
        if let Some(absent) = selected.iter().find(|column| !present.contains(*column)) {
            tracing::debug!(source = %label, column = %absent, "value column absent");
            return Err(KiraError::MissingValueColumn {
                omics: omics.to_string(),
                column: absent.to_string(),
            });
        }
    }

    // source × column × row, regrouped to column × row × source
    let cube = KeyedTable3::from_tables(
        sources
            .iter()
            .map(|(label, table)| (label.clone(), table.select_columns(&selected).transpose())),
    );
    let by_column = cube.permute_with_marker("231".parse::<AxisOrder>()?, missing);

    let mut matrices = BTreeMap::new();
    for column in omics.value_columns() {
        let table = by_column.slice(column.source).unwrap_or_default();
        let matrix = table.densify_with_marker(omics.output_order(), omics.id_label(), missing);
        tracing::debug!(
            omics = %omics,
            matrix = column.output,
            rows = matrix.rows.len(),
            "matrix integrated"
        );
        matrices.insert(column.output.to_string(), matrix);
    }
    Ok(matrices)
}

/// Stacks every source column side by side as `column___fileId`, the file id
/// being the last segment of the source label. A column seen in two
/// sources is an error.
pub fn stack_by_source(
    omics: OmicsType,
    sources: &BTreeMap<String, KeyedTable>,
    missing: &str,
) -> Result<Matrix, KiraError> {
    let mut seen = BTreeSet::new();
    let mut cells = Vec::new();
    for (label, table) in sources {
        let file_id = label.rsplit(KEY_SEPARATOR).next().unwrap_or(label.as_str());
        for column in table.column_keys() {
            if !seen.insert(column.to_string()) {
                return Err(KiraError::DuplicateKey(column.to_string()));
            }
        }
        cells.extend(table.iter().map(|(row, column, value)| {
            (
                format!("{column}{KEY_SEPARATOR}{file_id}"),
                row.to_string(),
                value.to_string(),
            )
        }));
    }
    let stacked = KeyedTable::from_cells(cells)?;
    Ok(stacked.densify_with_marker(omics.output_order(), omics.id_label(), missing))
}

pub fn somatic_file_prefix(name: &str) -> Result<[String; 3], KiraError> {
    let parts = name.split('.').collect::<Vec<_>>();
    if parts.len() < 4 {
        return Err(KiraError::SourceFileName(name.to_string()));
    }
    let program = parts[0].rsplit('/').next().unwrap_or(parts[0]);
    Ok([
        parts[3].to_string(),
        format!("{program}-{}", parts[1]),
        parts[2].to_string(),
    ])
}

pub fn merge_somatic(files: &BTreeMap<String, String>) -> Result<Matrix, KiraError> {
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for (name, text) in files {
        let prefix = somatic_file_prefix(name)?;
        let mut lines = text
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .skip_while(|line| line.starts_with('#'));

        let Some(first) = lines.next() else {
            tracing::warn!(file = %name, "empty mutation file");
            continue;
        };
        let file_header = first.split('\t').map(str::to_string).collect::<Vec<_>>();
        match &header {
            None => header = Some(file_header),
            Some(expected) if *expected != file_header => {
                return Err(KiraError::HeaderMismatch(name.clone()));
            }
            Some(_) => {}
        }

        for line in lines {
            let mut row = prefix.to_vec();
            row.extend(line.split('\t').map(str::to_string));
            rows.push(row);
        }
    }

    let header = header.ok_or(KiraError::EmptyTable)?;
    let mut full_header = SOMATIC_PREFIX_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    full_header.extend(header);
    Ok(Matrix {
        header: full_header,
        rows,
    })
}
