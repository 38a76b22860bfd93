use thiserror::Error;

/// Everything that can stop one (entity, season) pipeline run.
///
/// The driver never recovers from these locally; it records the failing
/// pair and moves on to the next season.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("season {season} source unavailable: {reason}")]
    Fetch { season: i32, reason: String },

    #[error("schema drift: {detail}")]
    Schema { detail: String },

    #[error("store transaction failed: {0}")]
    Store(#[from] rusqlite::Error),
}

impl EtlError {
    pub fn fetch(season: i32, reason: impl std::fmt::Display) -> Self {
        EtlError::Fetch {
            season,
            reason: reason.to_string(),
        }
    }

    pub fn schema(detail: impl Into<String>) -> Self {
        EtlError::Schema {
            detail: detail.into(),
        }
    }

    pub fn unknown_column(raw: &str) -> Self {
        EtlError::Schema {
            detail: format!("unrecognized raw column `{raw}`"),
        }
    }

    /// Short tag used in run summaries and the ingest ledger.
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::Fetch { .. } => "fetch",
            EtlError::Schema { .. } => "schema",
            EtlError::Store(_) => "store",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
