/*!
# File Precompiler

Applies the pipeline to files and directory trees on disk. In directory mode
each file is isolated: a failure is recorded in the summary and the walk
continues with the next file.
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::pipeline::{GrammarPrecompiler, PrecompileOutcome};
use crate::{PrecompileError, Result};

/// Disk front end for [`GrammarPrecompiler`]
pub struct FilePrecompiler {
    precompiler: GrammarPrecompiler,
    source_extensions: Vec<String>,
}

impl FilePrecompiler {
    pub fn new(precompiler: GrammarPrecompiler) -> Self {
        Self {
            precompiler,
            source_extensions: vec!["js".to_string(), "mjs".to_string(), "cjs".to_string()],
        }
    }

    /// Set the file extensions to process
    pub fn source_extensions(mut self, extensions: Vec<String>) -> Self {
        self.source_extensions = extensions;
        self
    }

    /// Read and transform one file without writing anything
    pub fn precompile_file<P: AsRef<Path>>(&self, source_file: P) -> Result<(String, PrecompileOutcome)> {
        let path = source_file.as_ref();
        let source = fs::read_to_string(path)?;
        self.precompiler
            .precompile_source(&source, &path.to_string_lossy())
    }

    /// Transform a single file into `output_file`
    pub fn transform_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source_file: P,
        output_file: Q,
    ) -> Result<FileTransformationSummary> {
        let output_path = output_file.as_ref();
        let (code, outcome) = self.precompile_file(source_file)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, code)?;

        let mut summary = FileTransformationSummary::new();
        summary.files_processed += 1;
        if outcome.modified() {
            summary.files_transformed += 1;
        }
        Ok(summary)
    }

    /// Transform every matching file below `source_dir`, mirroring the tree
    /// into `output_dir`
    pub fn transform_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source_dir: P,
        output_dir: Q,
    ) -> Result<FileTransformationSummary> {
        let source_path = source_dir.as_ref();
        let output_path = output_dir.as_ref();

        if !source_path.is_dir() {
            return Err(PrecompileError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Source directory does not exist: {}", source_path.display()),
            )));
        }

        fs::create_dir_all(output_path)?;
        let output_root = output_path.canonicalize()?;

        let mut summary = FileTransformationSummary::new();
        self.transform_directory_recursive(source_path, source_path, output_path, &output_root, &mut summary)?;
        tracing::info!(
            processed = summary.files_processed,
            transformed = summary.files_transformed,
            errors = summary.errors.len(),
            "Directory precompiled"
        );
        Ok(summary)
    }

    fn transform_directory_recursive(
        &self,
        current_dir: &Path,
        source_root: &Path,
        output_dir: &Path,
        output_root: &Path,
        summary: &mut FileTransformationSummary,
    ) -> Result<()> {
        let mut entries = fs::read_dir(current_dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<PathBuf>>>()?;
        entries.sort();

        for path in entries {
            if is_hidden(&path) {
                continue;
            }
            if path.is_dir() {
                // Never descend into the output tree or installed packages
                let is_output = path.canonicalize().is_ok_and(|dir| dir == output_root);
                if is_output || path.file_name().is_some_and(|name| name == "node_modules") {
                    continue;
                }
                self.transform_directory_recursive(&path, source_root, output_dir, output_root, summary)?;
            } else if self.should_process_file(&path) {
                let relative_path = path
                    .strip_prefix(source_root)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
                let output_file = output_dir.join(relative_path);

                match self.transform_file(&path, &output_file) {
                    Ok(file_summary) => summary.merge(file_summary),
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "Precompile failed");
                        summary.files_processed += 1;
                        summary.errors.push(format!("Error processing {}: {}", path.display(), e));
                    }
                }
            }
        }

        Ok(())
    }

    /// Check if a file should be processed based on its extension
    fn should_process_file(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension() {
            let ext_str = extension.to_string_lossy().to_lowercase();
            self.source_extensions.iter().any(|ext| ext.to_lowercase() == ext_str)
        } else {
            false
        }
    }
}

/// Dotfiles include the clones the node runtime writes next to sources
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Summary of file transformation results
#[derive(Debug, Default)]
pub struct FileTransformationSummary {
    pub files_processed: u64,
    /// Files in which at least one class received a grammar
    pub files_transformed: u64,
    pub errors: Vec<String>,
}

impl FileTransformationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: FileTransformationSummary) {
        self.files_processed += other.files_processed;
        self.files_transformed += other.files_transformed;
        self.errors.extend(other.errors);
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}
