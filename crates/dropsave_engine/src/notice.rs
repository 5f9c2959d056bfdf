use std::fmt;

/// User-facing messages raised by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The provider refused the submission; `error` is its raw reason.
    SubmitRejected { error: String },
    /// The submission could not be completed at all.
    SubmitFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SubmitRejected { error } => {
                write!(f, "Error saving URL to Dropbox:\n{error}")
            }
            Notice::SubmitFailed => write!(f, "Failed to save URL due to an unexpected error."),
        }
    }
}

pub trait NoticeSink: Send + Sync {
    fn emit(&self, notice: Notice);
}
