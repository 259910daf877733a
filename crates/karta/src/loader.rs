//! Loading feature files from disk.
//!
//! Kriya sources (`.kriya`, `.feature`) go through the parser; structured
//! sources (`.yaml`, `.yml`, `.json`) are deserialized straight into the
//! model. Both paths end with the same validation so a feature is accepted
//! or rejected identically whatever its format.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::kriya::{ParseError, parse_feature_with_source};
use crate::model::{Feature, ValidationError};

/// On-disk representation of a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureFormat {
    /// Kriya source text.
    Kriya,
    /// YAML serialization of the model.
    Yaml,
    /// JSON serialization of the model.
    Json,
}

impl FeatureFormat {
    /// Format implied by the extension of `path`, ignoring case.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "kriya" | "feature" => Some(Self::Kriya),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A feature file could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file or directory could not be read.
    #[error("failed to read {}: {error}", .path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: io::Error,
    },
    /// The extension is not one of the supported formats.
    #[error("unsupported feature file: {}", .path.display())]
    UnsupportedFormat {
        /// Offending path.
        path: PathBuf,
    },
    /// Kriya source failed to compile.
    #[error("{}: {error}", .path.display())]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: ParseError,
    },
    /// YAML did not describe a feature.
    #[error("{}: invalid YAML feature: {error}", .path.display())]
    Yaml {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: serde_yaml::Error,
    },
    /// JSON did not describe a feature.
    #[error("{}: invalid JSON feature: {error}", .path.display())]
    Json {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: serde_json::Error,
    },
    /// A structured feature broke a model invariant.
    #[error("{}: {error}", .path.display())]
    Validation {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        error: ValidationError,
    },
}

impl LoadError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::UnsupportedFormat { path }
            | Self::Parse { path, .. }
            | Self::Yaml { path, .. }
            | Self::Json { path, .. }
            | Self::Validation { path, .. } => path,
        }
    }
}

/// Read, compile and validate one feature file.
///
/// The path as given is recorded as the source of the feature and of
/// everything in it.
///
/// # Errors
/// Returns [`LoadError`] when the file cannot be read, has an unsupported
/// extension, or does not describe a valid feature.
pub fn load_feature_file(path: impl AsRef<Path>) -> Result<Feature, LoadError> {
    let path = path.as_ref();
    let format = FeatureFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let text = fs::read_to_string(path).map_err(|error| LoadError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    let feature = parse_with_format(&text, format, path)?;
    log::debug!("loaded feature `{}` from {}", feature.name, path.display());
    Ok(feature)
}

/// Compile `text` as `format`, recording `path` as its source.
///
/// # Errors
/// Returns [`LoadError`] when the text does not describe a valid feature.
pub fn parse_with_format(text: &str, format: FeatureFormat, path: &Path) -> Result<Feature, LoadError> {
    let source = path.to_string_lossy();
    let mut feature = match format {
        FeatureFormat::Kriya => {
            return parse_feature_with_source(text, &source).map_err(|error| LoadError::Parse {
                path: path.to_path_buf(),
                error,
            });
        }
        FeatureFormat::Yaml => serde_yaml::from_str::<Feature>(text).map_err(|error| {
            LoadError::Yaml {
                path: path.to_path_buf(),
                error,
            }
        })?,
        FeatureFormat::Json => serde_json::from_str::<Feature>(text).map_err(|error| {
            LoadError::Json {
                path: path.to_path_buf(),
                error,
            }
        })?,
    };
    feature.assign_source(&source);
    feature.validate().map_err(|error| LoadError::Validation {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(feature)
}

/// Every feature file beneath `dir`, sorted by path.
///
/// Symbolic links are not followed and files with unsupported extensions
/// are skipped.
///
/// # Errors
/// Returns [`LoadError::Io`] when the directory cannot be walked.
pub fn discover_feature_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, LoadError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.loop_ancestor().is_some() => continue,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                let message = err.to_string();
                let error = err.into_io_error().unwrap_or_else(|| io::Error::other(message));
                return Err(LoadError::Io { path, error });
            }
        };
        if entry.file_type().is_file() && FeatureFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load every feature file beneath `dir`.
///
/// Each file is loaded independently; one bad file does not stop the
/// others. Results are in path order.
///
/// # Errors
/// Returns [`LoadError::Io`] only when the directory itself cannot be
/// walked.
pub fn load_directory(
    dir: impl AsRef<Path>,
) -> Result<Vec<(PathBuf, Result<Feature, LoadError>)>, LoadError> {
    let files = discover_feature_files(dir)?;
    Ok(files
        .into_iter()
        .map(|path| {
            let loaded = load_feature_file(&path);
            (path, loaded)
        })
        .collect())
}
