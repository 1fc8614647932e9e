//! File discovery and multi-file runs

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::config::InstrumentConfig;
use crate::error::InstrumentError;

use super::identity::IdentityRecord;
use super::registry::IdentityRegistry;
use super::{instrument_source, FileInfo};

/// Outcome of instrumenting one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub modified: bool,
    pub records: Vec<IdentityRecord>,
}

/// A file a run could not process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of a whole-project run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub modified: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    pub records: Vec<IdentityRecord>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.modified.len() + self.unchanged.len()
    }

    fn push(&mut self, outcome: FileOutcome) {
        if outcome.modified {
            self.modified.push(outcome.path);
        } else {
            self.unchanged.push(outcome.path);
        }
        self.records.extend(outcome.records);
    }
}

/// Runs the instrumentation pass over files on disk
#[derive(Debug)]
pub struct Instrumenter {
    config: InstrumentConfig,
    registry: IdentityRegistry,
    dry_run: bool,
}

impl Instrumenter {
    pub fn new(config: InstrumentConfig) -> Self {
        let registry = IdentityRegistry::new(&config);
        Self {
            config,
            registry,
            dry_run: false,
        }
    }

    /// Compute results without writing any file
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    /// Every instrumentable file under the source root, in traversal order
    pub fn discover(&self) -> Result<Vec<PathBuf>, InstrumentError> {
        let root = self.config.source_root();
        if !root.is_dir() {
            return Err(InstrumentError::MissingRoot(root));
        }

        let files = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.has_extension(entry.path()))
            .map(DirEntry::into_path)
            .collect();
        Ok(files)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.config.exclude_dirs.iter().any(|d| d.as_str() == name.as_ref())
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|e| e == ext))
    }

    /// Instrument every file under the source root
    ///
    /// A file that fails to parse or cannot be written is logged and listed in
    /// the report; the rest of the run continues.
    pub fn process_all(&mut self) -> Result<BatchReport, InstrumentError> {
        let files = self.discover()?;
        tracing::info!(
            root = %self.config.source_root().display(),
            files = files.len(),
            "processing project"
        );

        self.registry.begin_run();
        let mut report = BatchReport::default();
        for path in files {
            match self.process_path(&path) {
                Ok(outcome) => report.push(outcome),
                Err(err) => {
                    tracing::error!(file = %path.display(), "{}", err);
                    report.failed.push(FailedFile {
                        path,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Instrument a single file with a fresh registry
    pub fn process_file(&mut self, path: &Path) -> Result<FileOutcome, InstrumentError> {
        if !path.is_file() {
            return Err(InstrumentError::FileNotFound(path.to_path_buf()));
        }
        self.registry.begin_run();
        self.process_path(path)
    }

    fn process_path(&mut self, path: &Path) -> Result<FileOutcome, InstrumentError> {
        let source =
            std::fs::read_to_string(path).map_err(|e| InstrumentError::io(path, e))?;

        self.registry.begin_file();
        let file = FileInfo::from_path(path, &self.config.project_root);
        let output = instrument_source(
            &source,
            &file,
            &mut self.registry,
            &self.config.iteration_method,
        )
        .map_err(|e| InstrumentError::parse(path, e))?;

        let modified = output.modified();
        if modified && !self.dry_run {
            std::fs::write(path, &output.source).map_err(|e| InstrumentError::io(path, e))?;
            tracing::info!(file = %file.file_path, elements = output.records.len(), "updated");
        } else if modified {
            tracing::info!(
                file = %file.file_path,
                elements = output.records.len(),
                "missing inspector attributes"
            );
        } else {
            tracing::debug!(file = %file.file_path, "unchanged");
        }

        Ok(FileOutcome {
            path: path.to_path_buf(),
            modified,
            records: output.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("components")).unwrap();
        fs::create_dir_all(src.join("node_modules/lib")).unwrap();
        fs::create_dir_all(src.join(".cache")).unwrap();
        fs::write(src.join("App.jsx"), "export default () => <main>Hi</main>;\n").unwrap();
        fs::write(src.join("components/Card.tsx"), "export const Card = () => <div />;\n").unwrap();
        fs::write(src.join("components/util.ts"), "export const x = 1;\n").unwrap();
        fs::write(src.join("node_modules/lib/Dep.jsx"), "<p />").unwrap();
        fs::write(src.join(".cache/Old.jsx"), "<p />").unwrap();
        dir
    }

    fn instrumenter(root: &Path) -> Instrumenter {
        Instrumenter::new(InstrumentConfig::default().with_project_root(root))
    }

    #[test]
    fn test_discover_filters_and_orders() {
        let dir = project();
        let files = instrumenter(dir.path()).discover().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/App.jsx", "src/components/Card.tsx"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = instrumenter(dir.path()).process_all().unwrap_err();
        assert!(matches!(err, InstrumentError::MissingRoot(_)));
    }

    #[test]
    fn test_dry_run_leaves_files_alone() {
        let dir = project();
        let mut inst = instrumenter(dir.path()).with_dry_run(true);
        let report = inst.process_all().unwrap();
        assert_eq!(report.modified.len(), 2);
        let app = fs::read_to_string(dir.path().join("src/App.jsx")).unwrap();
        assert!(!app.contains("data-component"));
    }

    #[test]
    fn test_missing_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = instrumenter(dir.path())
            .process_file(&dir.path().join("src/Nope.jsx"))
            .unwrap_err();
        assert!(matches!(err, InstrumentError::FileNotFound(_)));
    }
}
