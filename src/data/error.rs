use thiserror::Error;

/// Why a single file could not be loaded.
///
/// Every variant names the source so the message can be shown next to the
/// file it belongs to. A failed load never touches the series store.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{source_name}: missing required columns: {}", .missing.join(", "))]
    MissingColumns {
        source_name: String,
        missing: Vec<&'static str>,
    },

    #[error("{source_name}: text is neither valid UTF-8 nor Windows-1251")]
    Decode { source_name: String },

    #[error("{source_name}: row {row}: cannot parse timestamp '{value}'")]
    TimestampParse {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("{source_name}: row {row}: invalid {column} '{value}'")]
    ValueParse {
        source_name: String,
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("{source_name}: malformed CSV: {err}")]
    Csv {
        source_name: String,
        #[source]
        err: csv::Error,
    },

    #[error("{source_name}: malformed JSON: {err}")]
    Json {
        source_name: String,
        #[source]
        err: serde_json::Error,
    },

    #[error("{source_name}: cannot read parquet: {err}")]
    Parquet {
        source_name: String,
        #[source]
        err: parquet::errors::ParquetError,
    },

    #[error("{source_name}: {context}: {err}")]
    Arrow {
        source_name: String,
        context: String,
        #[source]
        err: arrow::error::ArrowError,
    },

    #[error("{source_name}: {err}")]
    Io {
        source_name: String,
        #[source]
        err: std::io::Error,
    },

    #[error("{source_name}: {detail}")]
    Malformed { source_name: String, detail: String },
}

impl LoadError {
    /// Name of the file the error belongs to.
    pub fn source_name(&self) -> &str {
        match self {
            LoadError::MissingColumns { source_name, .. }
            | LoadError::Decode { source_name }
            | LoadError::TimestampParse { source_name, .. }
            | LoadError::ValueParse { source_name, .. }
            | LoadError::Csv { source_name, .. }
            | LoadError::Json { source_name, .. }
            | LoadError::Parquet { source_name, .. }
            | LoadError::Arrow { source_name, .. }
            | LoadError::Io { source_name, .. }
            | LoadError::Malformed { source_name, .. } => source_name,
        }
    }
}
