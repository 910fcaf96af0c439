//! Domain error types.

/// Top-level error type for overnight.
#[derive(Debug, thiserror::Error)]
pub enum OvernightError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("bad bar data in {file} line {line}: {reason}")]
    BarParse {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("no data for symbol {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OvernightError {
    /// Process exit code for this error category.
    ///
    /// Missing data and bad configuration both exit 2 at the top level.
    pub fn exit_code(&self) -> u8 {
        match self {
            OvernightError::Io(_) => 1,
            OvernightError::ConfigParse { .. }
            | OvernightError::ConfigMissing { .. }
            | OvernightError::ConfigInvalid { .. }
            | OvernightError::NoData { .. } => 2,
            OvernightError::Database { .. } | OvernightError::DatabaseQuery { .. } => 3,
            OvernightError::BarParse { .. } => 4,
        }
    }
}

impl From<&OvernightError> for std::process::ExitCode {
    fn from(err: &OvernightError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
