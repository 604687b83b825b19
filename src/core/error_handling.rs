//! Generic error handling utilities
//!
//! Every error raised while monitoring a binding is caught at the binding
//! level and logged, never propagated out of the polling loop. This module
//! gives those errors a common shape so that the loop can log them at the
//! right severity without knowing their concrete type.

/// Trait for errors that know how loudly they should be reported
///
/// # Severity guidelines
/// - `Error`: the failure probably affects every binding (the registry page
///   layout changed, the store is unavailable) and an operator should look
/// - `Warn`: a transient, per-binding failure that the next cycle retries
///   naturally (timeouts, expired sessions, undeliverable notifications)
///
/// `is_transient()` should return `true` when simply retrying later is
/// expected to succeed without any operator action.
pub trait ContextualError: std::error::Error {
    /// Log level this error should be reported at
    fn severity(&self) -> log::Level;

    /// Returns true if the next poll cycle is expected to recover on its own
    fn is_transient(&self) -> bool;
}

/// Log an error with the severity it declares
///
/// The primary line always carries the operation context plus the error's
/// display form. The debug representation is only emitted at debug level.
///
/// # Examples
/// ```rust
/// # use finewatch::core::error_handling::log_error_with_context;
/// # use finewatch::registry::api::ScrapeError;
/// let err = ScrapeError::Network {
///     message: "connection reset".to_string(),
/// };
/// log_error_with_context(&err, "fetching fines for 01ABC123");
/// // Logs at WARN: "fetching fines for 01ABC123: network error: connection reset"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    let suffix = if error.is_transient() {
        " (will retry next cycle)"
    } else {
        ""
    };
    log::log!(
        error.severity(),
        "{}: {}{}",
        operation_context,
        error,
        suffix
    );
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
