//! Bundle source loading.
//!
//! A source is either a single file or a directory. Directory entries are read
//! in file-name order; only `.yaml`, `.yml` and `.json` files are considered,
//! and sub-directories are descended into only when loading recursively. Every
//! file may hold several YAML documents; empty documents are skipped and
//! `List` documents are flattened into their items.

use crate::document::Document;
use crate::error::ManifestError;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Reads every document found at `path`.
pub fn load_path(path: &Path, recursive: bool) -> Result<Vec<Document>, ManifestError> {
    let metadata = fs::metadata(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.is_dir() {
        let mut documents = Vec::new();
        for entry in sorted_entries(path)? {
            if entry.is_dir() {
                if recursive {
                    documents.extend(load_path(&entry, true)?);
                }
            } else if has_manifest_extension(&entry) {
                documents.extend(load_file(&entry)?);
            }
        }
        Ok(documents)
    } else {
        load_file(path)
    }
}

/// Parses a multi-document YAML (or JSON) string.
pub fn parse_documents(content: &str, source: &Path) -> Result<Vec<Document>, ManifestError> {
    let mut documents = Vec::new();
    for de in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(de).map_err(|e| ManifestError::Yaml {
            path: source.to_path_buf(),
            source: e,
        })?;
        push_value(&mut documents, value)?;
    }
    Ok(documents)
}

fn push_value(documents: &mut Vec<Document>, value: Value) -> Result<(), ManifestError> {
    if value.is_null() || value.as_object().is_some_and(serde_json::Map::is_empty) {
        return Ok(());
    }
    if value.get("kind").and_then(Value::as_str) == Some("List") {
        if let Some(Value::Array(items)) = value.get("items") {
            for item in items.clone() {
                push_value(documents, item)?;
            }
        }
        return Ok(());
    }
    documents.push(Document::from_value(value)?);
    Ok(())
}

fn load_file(path: &Path) -> Result<Vec<Document>, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let documents = parse_documents(&content, path)?;
    debug!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let io_error = |source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort();
    Ok(entries)
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
