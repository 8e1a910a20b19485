//! Error types for IFC Takeoff.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading a metadata graph or scene snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the input file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected shape.
    #[error("invalid JSON in '{path}': {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors that can occur when loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A colour component lies outside `0.0..=1.0`.
    #[error("invalid colour '{name}': components must be within 0..=1")]
    InvalidColor { name: &'static str },
}

/// Errors raised by the classification store or its adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the request.
    #[error("classification store unavailable: {message}")]
    Unavailable { message: String },

    /// Another save for the same key has not finished yet.
    #[error("a save for '{category}' / '{type_name}' is already in progress")]
    SaveInFlight { category: String, type_name: String },

    /// The override has neither a project nor a center scope id.
    #[error("override has no scope id")]
    MissingScope,

    /// Failed to read or write the row file.
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to (de)serialize persisted rows.
    #[error("row serialization failed: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

/// Errors that can interrupt an aggregation pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// The model was replaced or unloaded while the pass was running.
    #[error("aggregation cancelled: model was replaced")]
    Cancelled,
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write or flush the output file.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}
