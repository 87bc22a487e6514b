use supadash::diagnostics::DiagnosticsError;
use supadash::{AuthError, DataError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A protected command was run without a valid session.
    #[error("not signed in; run `supadash login`")]
    NotSignedIn,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    /// No email was given and none could be taken from the session.
    #[error("no email given and no signed-in user with an email")]
    MissingEmail,

    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::NotSignedIn => Some(ErrorKind::NotAuthenticated),
            Self::Auth(e) => Some(e.kind()),
            Self::Data(e) => Some(e.kind()),
            Self::MissingEmail => Some(ErrorKind::ValidationError),
            Self::Diagnostics(_) | Self::Json(_) => None,
        }
    }

    /// One-line message for stderr: the user-facing category, then the detail.
    #[must_use]
    pub fn render(&self) -> String {
        match self.kind() {
            Some(kind) if !matches!(self, Self::NotSignedIn) => format!("error: {} ({self})", kind.user_message()),
            _ => format!("error: {self}"),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
