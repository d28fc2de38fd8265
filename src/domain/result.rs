//! Result type alias for phivault

use super::errors::PhiVaultError;

/// Result type alias for phivault operations
///
/// # Examples
///
/// ```
/// use phivault::domain::result::Result;
/// use phivault::domain::errors::PhiVaultError;
///
/// fn failing_function() -> Result<()> {
///     Err(PhiVaultError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PhiVaultError>;
