use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::OmicsType;
use crate::error::KiraError;
use crate::fs_util::enclosed_path;

const SEP: &str = "--";

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn from_path(path: &Path) -> Result<Self, KiraError> {
        let root = Utf8PathBuf::from_path_buf(path.to_path_buf())
            .map_err(|_| KiraError::Filesystem(format!("non UTF-8 path: {}", path.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// `Project_<p1_p2>--Omicstype_<type>--Sampletype_<group>`
    pub fn cohort_base(projects: &[String], omics: OmicsType, group: &str) -> String {
        format!(
            "Project_{}{SEP}Omicstype_{omics}{SEP}Sampletype_{group}",
            projects.join("_")
        )
    }

    pub fn answer_path(&self, base: &str) -> Utf8PathBuf {
        self.root.join(format!("{base}.json"))
    }

    pub fn case_json_path(&self, base: &str) -> Utf8PathBuf {
        self.root.join(format!("{base}{SEP}Case.json"))
    }

    pub fn case_tsv_path(&self, base: &str) -> Utf8PathBuf {
        self.root.join(format!("{base}{SEP}Case.tsv"))
    }

    pub fn matrix_path(&self, base: &str, omics: OmicsType, matrix: &str) -> Utf8PathBuf {
        if omics.has_sample_groups() {
            self.root.join(format!("{base}{SEP}{matrix}.tsv"))
        } else {
            self.root.join(format!("{base}.tsv"))
        }
    }

    pub fn download_path(&self, base: &str, single_file: Option<&str>) -> Result<Utf8PathBuf, KiraError> {
        let base = enclosed_path(base)?;
        Ok(match single_file {
            Some(file) => self.root.join(base).join(enclosed_path(file)?),
            None => self.root.join(format!("{base}.tar.gz")),
        })
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join("manifest.json")
    }

    pub fn ensure_root(&self) -> Result<(), KiraError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("kira-omics-file")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), KiraError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<(), KiraError> {
        Self::write_json(&self.manifest_path(), manifest)
    }

    pub fn read_manifest(&self) -> Result<Option<Manifest>, KiraError> {
        let path = self.manifest_path();
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let manifest = serde_json::from_str(&content)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(Some(manifest))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub tool: String,
    pub created_at: String,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub omics_type: String,
    pub sample_group: String,
    pub kind: String,
    pub path: String,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            tool: format!("kira-omics/{}", env!("CARGO_PKG_VERSION")),
            created_at: chrono::Utc::now().to_rfc3339(),
            artifacts: Vec::new(),
        }
    }

    pub fn record(&mut self, artifact: Artifact) {
        self.artifacts.retain(|existing| existing.path != artifact.path);
        self.artifacts.push(artifact);
    }
}
