//! Stable error codes surfaced in CLI diagnostics.

/// Every error enum maps to a stable code string so diagnostics stay
/// greppable across message wording changes.
pub trait ErrorCode {
    /// Returns the error code string (e.g., "CONFIG_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the one-line diagnostic: `error[CODE]: message`.
    fn diagnostic(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("error[{}]: {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const MISSING_DATA: &str = "MISSING_DATA";
pub const REPORT_FAILED: &str = "REPORT_FAILED";
