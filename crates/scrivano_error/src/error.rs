//! Top-level error wrapper types.

use crate::{ConfigError, DispatchError};

/// The foundation error enum for the scrivano workspace.
///
/// # Examples
///
/// ```
/// use scrivano_error::{ConfigError, ScrivanoError};
///
/// let cfg_err = ConfigError::new("missing [dispatch] section");
/// let err: ScrivanoError = cfg_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ScrivanoErrorKind {
    /// Dispatch failure (classified network attempt)
    #[from(DispatchError)]
    Dispatch(DispatchError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Scrivano error with kind discrimination.
///
/// # Examples
///
/// ```
/// use scrivano_error::{ConfigError, ScrivanoResult};
///
/// fn might_fail() -> ScrivanoResult<()> {
///     Err(ConfigError::new("missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Scrivano Error: {}", _0)]
pub struct ScrivanoError(Box<ScrivanoErrorKind>);

impl ScrivanoError {
    /// Create a new error from a kind.
    pub fn new(kind: ScrivanoErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ScrivanoErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ScrivanoErrorKind
impl<T> From<T> for ScrivanoError
where
    T: Into<ScrivanoErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for scrivano operations.
pub type ScrivanoResult<T> = std::result::Result<T, ScrivanoError>;
