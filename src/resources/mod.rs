//! Backend operators: the four reconciliation capabilities and their outcomes.
pub mod fs;
pub mod mock;
pub mod registry;

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Message returned by capabilities an operator does not implement.
pub const NOT_SUPPORTED: &str = "Not Supported Error";

/// Result of a single capability call.
///
/// # Examples
///
/// ```
/// use provision_cli::resources::{NOT_SUPPORTED, Outcome};
///
/// assert!(Outcome::success().ok);
/// assert_eq!(Outcome::not_supported().message, NOT_SUPPORTED);
/// assert!(!Outcome::failure("bucket missing").ok);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the call reached the desired state.
    pub ok: bool,
    /// Human-readable detail (empty on plain success).
    pub message: String,
}

impl Outcome {
    /// Successful outcome with no message.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    /// Successful outcome with a message.
    #[must_use]
    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// Failed outcome.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    /// Failed outcome for an unimplemented capability.
    #[must_use]
    pub fn not_supported() -> Self {
        Self::failure(NOT_SUPPORTED)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.ok { "ok" } else { "failed" };
        if self.message.is_empty() {
            f.write_str(status)
        } else {
            write!(f, "{status}: {}", self.message)
        }
    }
}

/// One of the four operator capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Bring the resource into existence.
    Create,
    /// Remove the resource.
    Delete,
    /// Check that the resource exists.
    Exists,
    /// Check that the resource does not exist.
    Absent,
}

impl Capability {
    /// Lower-case capability name as used in traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Exists => "exists",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend adapter bound to one concrete resource.
///
/// Every capability defaults to [`Outcome::not_supported`].  Returning
/// `Err` signals an unexpected backend failure; the engine converts it into
/// a failed outcome rather than aborting.
pub trait Operator: Send + Sync + fmt::Debug {
    /// Human-readable description of the bound resource.
    fn description(&self) -> String;

    /// Create the resource.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    fn create(&self) -> Result<Outcome> {
        Ok(Outcome::not_supported())
    }

    /// Delete the resource.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    fn delete(&self) -> Result<Outcome> {
        Ok(Outcome::not_supported())
    }

    /// Check that the resource exists.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    fn exists(&self) -> Result<Outcome> {
        Ok(Outcome::not_supported())
    }

    /// Check that the resource is absent.
    ///
    /// # Errors
    ///
    /// Returns an error on backend failure.
    fn absent(&self) -> Result<Outcome> {
        Ok(Outcome::not_supported())
    }

    /// Settle delay used when a step does not specify `wait_time`.
    fn default_wait_time(&self) -> Duration {
        Duration::ZERO
    }
}

/// Dispatch a capability by tag.
///
/// # Errors
///
/// Propagates the operator's error.
pub fn invoke(operator: &dyn Operator, capability: Capability) -> Result<Outcome> {
    match capability {
        Capability::Create => operator.create(),
        Capability::Delete => operator.delete(),
        Capability::Exists => operator.exists(),
        Capability::Absent => operator.absent(),
    }
}

/// Deserialize a dynamic parameter map into a typed struct.
///
/// # Errors
///
/// Returns the deserializer error when the map does not fit `T`.
pub fn typed_params<T: DeserializeOwned>(map: &Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(map.clone()))
}
