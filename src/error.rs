//! Error kinds surfaced by the dashboard.

use thiserror::Error;

/// Failure of a single call to the order backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

/// A failed load, shown to the operator as a banner.
///
/// Neither kind is fatal: the previous article list or order set stays in
/// place and the next tick (or a manual refresh) retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Errore nel caricamento degli articoli: {0}")]
    Articles(#[source] FetchError),
    #[error("Errore di rete o del server nel caricamento degli ordini: {0}")]
    Orders(#[source] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_text_includes_cause() {
        let err = LoadError::Orders(FetchError::Server {
            status: 500,
            message: "Impossibile connettersi al database".to_string(),
        });
        let text = err.to_string();
        assert!(text.contains("ordini"));
        assert!(text.contains("500"));
        assert!(text.contains("database"));
    }
}
