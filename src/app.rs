use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;

use crate::catalog::{CatalogAnswer, CatalogQuery, FileDownload, case_table};
use crate::compiler::{CohortCompiler, CompiledCohort};
use crate::config::Settings;
use crate::domain::{DEFAULT_ID_LABEL, KEY_SEPARATOR, OmicsType};
use crate::error::KiraError;
use crate::filter::FilterSpec;
use crate::fs_util::{enclosed_path, read_source_text};
use crate::merge;
use crate::sets;
use crate::store::{Artifact, Manifest, Store};
use crate::table::{DimOrder, KeyedTable, Matrix};

#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub filter: FilterSpec,
    pub groups: CompiledCohort,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub items: Vec<AnswerItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerItem {
    pub omics_type: String,
    pub sample_group: String,
    pub files: usize,
    pub cases: usize,
    pub answer_path: String,
    pub case_json_path: Option<String>,
    pub case_tsv_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrateResult {
    pub omics_type: String,
    pub sample_group: String,
    pub sources: usize,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub omics_type: String,
    pub files: usize,
    pub bytes: usize,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn phase(sink: &dyn ProgressSink, message: String, elapsed: Option<Duration>) {
    sink.event(ProgressEvent { message, elapsed });
}

#[derive(Clone)]
pub struct App<C: CatalogQuery> {
    store: Store,
    catalog: C,
    settings: Settings,
}

impl<C: CatalogQuery> App<C> {
    pub fn new(store: Store, catalog: C, settings: Settings) -> Self {
        Self {
            store,
            catalog,
            settings,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn compile(&self, filter_path: &Path, sink: &dyn ProgressSink) -> Result<CompileResult, KiraError> {
        phase(sink, format!("phase=Parse; reading {}", filter_path.display()), None);
        let filter = FilterSpec::from_path(filter_path)?;
        self.compile_spec(filter, sink)
    }

    pub fn compile_spec(&self, filter: FilterSpec, sink: &dyn ProgressSink) -> Result<CompileResult, KiraError> {
        let started = Instant::now();
        phase(sink, "phase=Compile; resolving data-types".to_string(), None);
        let groups = CohortCompiler::new(&self.catalog, &self.settings).compile(&filter)?;
        phase(
            sink,
            format!("phase=Compile; {} groups", groups.len()),
            Some(started.elapsed()),
        );
        Ok(CompileResult { filter, groups })
    }

    pub fn fetch_answers(&self, filter_path: &Path, sink: &dyn ProgressSink) -> Result<AnswerResult, KiraError> {
        let compiled = self.compile(filter_path, sink)?;
        self.store.ensure_root()?;
        let mut manifest = self.store.read_manifest()?.unwrap_or_else(Manifest::new);

        let mut items = Vec::new();
        for (omics, group, predicate) in compiled.groups.iter() {
            let started = Instant::now();
            phase(sink, format!("phase=Query; {omics} {group}"), None);
            let answer = self.catalog.query_files(predicate)?;
            let info = answer.info()?;
            let projects = match info.projects() {
                projects if projects.is_empty() => compiled.filter.project_ids.clone(),
                projects => projects,
            };
            let base = cohort_base(&projects, omics, group)?;

            let answer_path = self.store.answer_path(&base);
            Store::write_bytes_atomic(&answer_path, &answer.to_vec_pretty()?)?;
            manifest.record(artifact(omics, group, "answer", &answer_path));

            let case_ids = sets::distinct_spans(
                &info
                    .barcode_projects
                    .iter()
                    .filter(|(_, project)| self.settings.is_cohort_project(project))
                    .map(|(barcode, _)| barcode.clone())
                    .collect::<Vec<_>>(),
                self.settings.barcode.case,
            );
            let (case_json_path, case_tsv_path) = if case_ids.is_empty() {
                (None, None)
            } else {
                phase(sink, format!("phase=Query; {} cases", case_ids.len()), None);
                let cases = self.catalog.query_cases(&case_ids)?;
                let table = case_table(&cases)?.densify_with_marker(
                    DimOrder::RowsFirst,
                    DEFAULT_ID_LABEL,
                    &self.settings.missing_marker,
                );
                let json_path = self.store.case_json_path(&base);
                let tsv_path = self.store.case_tsv_path(&base);
                Store::write_json(&json_path, &cases)?;
                Store::write_bytes_atomic(&tsv_path, table.to_tsv().as_bytes())?;
                manifest.record(artifact(omics, group, "cases", &json_path));
                manifest.record(artifact(omics, group, "case_table", &tsv_path));
                (Some(json_path.to_string()), Some(tsv_path.to_string()))
            };

            tracing::info!(
                omics = %omics,
                group,
                files = info.file_ids.len(),
                "answer saved"
            );
            phase(
                sink,
                format!("phase=Write; {answer_path}"),
                Some(started.elapsed()),
            );
            items.push(AnswerItem {
                omics_type: omics.to_string(),
                sample_group: group.to_string(),
                files: info.file_ids.len(),
                cases: case_ids.len(),
                answer_path: answer_path.to_string(),
                case_json_path,
                case_tsv_path,
            });
        }

        self.store.write_manifest(&manifest)?;
        Ok(AnswerResult { items })
    }

    pub fn integrate(
        &self,
        answer_path: &Path,
        files_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<IntegrateResult, KiraError> {
        let started = Instant::now();
        let answer = read_answer(answer_path)?;
        let omics = answer.detect_omics_type()?;
        let group = answer.detect_sample_group(
            omics,
            &self.settings.barcode,
            &self.settings.cohort_prefix,
        )?;
        let info = answer.info()?;
        phase(
            sink,
            format!("phase=Resolve; {omics} {group}, {} files", info.file_labels.len()),
            None,
        );

        let mut texts = BTreeMap::new();
        for path in info.file_labels.keys() {
            let full = files_dir.join(enclosed_path(path)?);
            if !full.is_file() {
                let file_id = path.split('/').next().unwrap_or(path.as_str());
                return Err(KiraError::MissingDataFile(file_id.to_string()));
            }
            texts.insert(path.clone(), read_source_text(&full)?);
        }

        let matrices = if omics == OmicsType::SomaticMutation {
            BTreeMap::from([(omics.to_string(), merge::merge_somatic(&texts)?)])
        } else {
            phase(sink, "phase=Parse; per-file tables".to_string(), None);
            let mut sources = BTreeMap::new();
            for (path, text) in &texts {
                let (file_id, _) = path.split_once('/').unwrap_or((path.as_str(), ""));
                let label = info.file_labels.get(path).map(String::as_str).unwrap_or_default();
                let mut table = merge::parse_source_table(omics, text)?;
                if omics == OmicsType::CnvGene {
                    table = relabel_aliquots(&table, &info.aliquot_barcodes, &info.barcode_projects)?;
                }
                sources.insert(format!("{label}{KEY_SEPARATOR}{file_id}"), table);
            }
            merge::integrate(omics, &sources, &self.settings.missing_marker)?
        };

        let base = cohort_base(&info.projects(), omics, &group)?;
        let outputs = self.write_matrices(omics, &group, &base, &matrices)?;
        phase(
            sink,
            format!("phase=Write; {} matrices", outputs.len()),
            Some(started.elapsed()),
        );
        Ok(IntegrateResult {
            omics_type: omics.to_string(),
            sample_group: group,
            sources: texts.len(),
            outputs,
        })
    }

    pub fn download<D: FileDownload>(
        &self,
        answer_path: &Path,
        downloader: &D,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, KiraError> {
        let started = Instant::now();
        let answer = read_answer(answer_path)?;
        let omics = answer.detect_omics_type()?;
        let group = answer.detect_sample_group(
            omics,
            &self.settings.barcode,
            &self.settings.cohort_prefix,
        )?;
        let info = answer.info()?;
        if info.file_ids.is_empty() {
            return Err(KiraError::MalformedAnswer("answer lists no files".to_string()));
        }

        let base = cohort_base(&info.projects(), omics, &group)?;
        let single = match info.file_labels.len() {
            1 => info.file_labels.keys().next().map(String::as_str),
            _ => None,
        };
        let out = self.store.download_path(&base, single)?;

        phase(sink, format!("phase=Download; {} files", info.file_ids.len()), None);
        let bytes = downloader.download(&info.file_ids)?;
        Store::write_bytes_atomic(&out, &bytes)?;
        phase(sink, format!("phase=Write; {out}"), Some(started.elapsed()));
        tracing::info!(omics = %omics, files = info.file_ids.len(), path = %out, "files downloaded");

        let mut manifest = self.store.read_manifest()?.unwrap_or_else(Manifest::new);
        manifest.record(artifact(omics, &group, "download", &out));
        self.store.write_manifest(&manifest)?;
        Ok(DownloadResult {
            omics_type: omics.to_string(),
            files: info.file_ids.len(),
            bytes: bytes.len(),
            path: out.to_string(),
        })
    }

    fn write_matrices(
        &self,
        omics: OmicsType,
        group: &str,
        base: &str,
        matrices: &BTreeMap<String, Matrix>,
    ) -> Result<Vec<String>, KiraError> {
        self.store.ensure_root()?;
        let mut manifest = self.store.read_manifest()?.unwrap_or_else(Manifest::new);
        let mut outputs = Vec::with_capacity(matrices.len());
        for (name, matrix) in matrices {
            let path = self.store.matrix_path(base, omics, name);
            Store::write_bytes_atomic(&path, matrix.to_tsv().as_bytes())?;
            tracing::info!(path = %path, rows = matrix.rows.len(), "matrix written");
            manifest.record(artifact(omics, group, name, &path));
            outputs.push(path.to_string());
        }
        self.store.write_manifest(&manifest)?;
        Ok(outputs)
    }
}

/// Artifact base name; project ids come from the catalog and must not leave the store.
fn cohort_base(projects: &[String], omics: OmicsType, group: &str) -> Result<String, KiraError> {
    let base = Store::cohort_base(projects, omics, group);
    enclosed_path(&base)?;
    Ok(base)
}

fn read_answer(path: &Path) -> Result<CatalogAnswer, KiraError> {
    let bytes = fs::read(path)
        .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
    CatalogAnswer::from_slice(&bytes)
}

fn relabel_aliquots(
    table: &KeyedTable,
    aliquot_barcodes: &BTreeMap<String, String>,
    barcode_projects: &BTreeMap<String, String>,
) -> Result<KeyedTable, KiraError> {
    table.rename_columns(|aliquot| match aliquot_barcodes.get(aliquot) {
        Some(barcode) => {
            let project = barcode_projects.get(barcode).map(String::as_str).unwrap_or_default();
            format!("{project}{KEY_SEPARATOR}{barcode}")
        }
        None => aliquot.to_string(),
    })
}

fn artifact(omics: OmicsType, group: &str, kind: &str, path: &Utf8Path) -> Artifact {
    Artifact {
        omics_type: omics.to_string(),
        sample_group: group.to_string(),
        kind: kind.to_string(),
        path: path.to_string(),
    }
}
