//! Open, extract and store, for one file or a batch.
//!
//! ```rust,no_run
//! use docsift::config::Config;
//! use docsift::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::from_config(&Config::default());
//! let report = pipeline.process_all(["report.pdf", "slides.pptx"]);
//! for failure in report.failures() {
//!     eprintln!("{}: {}", failure.path.display(), failure.error);
//! }
//! ```
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{ExtractConfig, Extractor};
use crate::loader::LoaderRegistry;
use crate::model::{DocumentInfo, ExtractionResult};
use crate::storage::{BackendKind, Storage};

/// Where a sink writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The same path for every document, e.g. a database file
    Shared(PathBuf),
    /// A subdirectory per document under this parent
    PerDocument(PathBuf),
}

impl Destination {
    /// Concrete destination for one document.
    pub fn resolve(&self, info: &DocumentInfo) -> PathBuf {
        match self {
            Destination::Shared(path) => path.clone(),
            Destination::PerDocument(parent) => parent.join(document_dir_name(info)),
        }
    }
}

/// `<file stem>_<extension>`, so `a.pdf` and `a.docx` do not collide.
pub fn document_dir_name(info: &DocumentInfo) -> String {
    let stem = Path::new(&info.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| info.file_name.clone());
    format!("{stem}_{}", info.format.extension())
}

struct Sink {
    storage: Box<dyn Storage>,
    destination: Destination,
}

/// A file that could not be opened or stored.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of [`Pipeline::process_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    processed: Vec<PathBuf>,
    failures: Vec<Failure>,
}

impl BatchReport {
    pub fn processed(&self) -> &[PathBuf] {
        &self.processed
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loader registry, extraction settings and storage sinks.
pub struct Pipeline {
    registry: LoaderRegistry,
    config: ExtractConfig,
    sinks: Vec<Sink>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field(
                "sinks",
                &self
                    .sinks
                    .iter()
                    .map(|s| (s.storage.name(), &s.destination))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Pipeline {
    /// A pipeline with no sinks.
    pub fn new(registry: LoaderRegistry, config: ExtractConfig) -> Self {
        Self {
            registry,
            config,
            sinks: Vec::new(),
        }
    }

    /// Default loaders and the sinks named in `config.output`.
    pub fn from_config(config: &Config) -> Self {
        let mut pipeline = Self::new(LoaderRegistry::with_defaults(), config.extract.clone());
        for kind in &config.output.backends {
            let destination = match kind {
                BackendKind::File => Destination::PerDocument(config.output.directory.clone()),
                BackendKind::Sqlite => Destination::Shared(config.output.database.clone()),
            };
            pipeline.add_sink(kind.backend(), destination);
        }
        pipeline
    }

    pub fn add_sink(&mut self, storage: Box<dyn Storage>, destination: Destination) -> &mut Self {
        self.sinks.push(Sink { storage, destination });
        self
    }

    #[inline]
    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    /// Open and extract without storing.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionResult> {
        let handle = self.registry.open(path)?;
        Ok(Extractor::new(&handle, &self.config).extract_all())
    }

    /// Extract one file and save it to every sink.
    ///
    /// All sinks are attempted; the first storage error is returned.
    pub fn process<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionResult> {
        let path = path.as_ref();
        let result = self.extract(path)?;

        let mut first_error = None;
        for sink in &self.sinks {
            let destination = sink.destination.resolve(&result.document);
            if let Err(err) = sink.storage.save(&result, &destination) {
                error!(
                    file = %path.display(),
                    backend = sink.storage.name(),
                    destination = %destination.display(),
                    error = %err,
                    "failed to store extraction"
                );
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }

    /// Process each path in turn. Failures do not stop the batch.
    pub fn process_all<I, P>(&self, paths: I) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = BatchReport::default();
        for path in paths {
            let path = path.as_ref();
            match self.process(path) {
                Ok(_) => report.processed.push(path.to_path_buf()),
                Err(error) => {
                    warn!(file = %path.display(), stage = %error.stage(), error = %error, "skipping file");
                    report.failures.push(Failure {
                        path: path.to_path_buf(),
                        error,
                    });
                },
            }
        }
        info!(
            processed = report.processed.len(),
            failed = report.failures.len(),
            "batch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::Stage;
    use crate::pdf::fixtures::sample_pdf;
    use crate::storage::{FileStorage, SqliteStore};

    #[test]
    fn test_batch_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("hello.pdf");
        fs::write(&pdf, sample_pdf()).unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "plain").unwrap();

        let mut config = Config::default();
        config.output.directory = dir.path().join("out");
        config.output.database = dir.path().join("out/docs.db");
        config.output.backends = vec![BackendKind::File, BackendKind::Sqlite];
        let pipeline = Pipeline::from_config(&config);

        let report = pipeline.process_all([&notes, &pdf, &dir.path().join("gone.docx")]);
        assert_eq!(report.processed(), [pdf.clone()]);
        assert_eq!(report.failures().len(), 2);
        assert!(report.failures().iter().all(|f| f.error.stage() == Stage::Open));

        let out = dir.path().join("out/hello_pdf");
        assert!(out.join("text.txt").is_file());
        let store = SqliteStore::open(&config.output.database).unwrap();
        assert_eq!(store.list_documents().unwrap().len(), 1);
    }

    #[test]
    fn test_store_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("hello.pdf");
        fs::write(&pdf, sample_pdf()).unwrap();
        // A regular file where the output directory should go.
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "").unwrap();

        let mut pipeline = Pipeline::new(LoaderRegistry::with_defaults(), ExtractConfig::default());
        pipeline.add_sink(Box::new(FileStorage), Destination::PerDocument(blocked));
        let err = pipeline.process(&pdf).unwrap_err();
        assert_eq!(err.stage(), Stage::Store);
    }

    #[test]
    fn test_dir_name_keeps_extension() {
        let handle = crate::extract::test_support::handle(&crate::loader::PdfLoader, "a.b.pdf", &sample_pdf());
        assert_eq!(document_dir_name(handle.info()), "a.b_pdf");
    }
}
