//! Error Types for Output Control and Configuration
//!
//! ## Design Philosophy
//!
//! The controller runs on devices with tens of KB of free heap, so errors
//! follow the same rules as the rest of the core:
//!
//! 1. **Small Size**: variants carry numbers and `&'static str` only.
//! 2. **No Heap Allocation**: no `String`, no boxed sources.
//! 3. **Copy Semantics**: errors are returned from the command path and
//!    logged from the control loop without ownership juggling.
//!
//! ## Error Categories
//!
//! ### Rejected commands
//! - `ValidationError`: bad index, missing field, out-of-range value or unknown
//!   mode. Raised before any state changes.
//!
//! ### Rejected activations
//! - `ControlError::SensorUnavailable`: a temperature-driven mode was requested
//!   on a channel without a temperature reading, or dewpoint mode without an
//!   ambient reading. The output keeps its previous mode.
//!
//! ### Unreadable persisted state
//! - `ConfigError`: the stored output configuration could not be parsed. The
//!   affected channels stay `Off`.
//!
//! Losing a reading while a temperature mode is active is *not* an error: the
//! controller forces duty to 0, logs a warning and recovers on its own once
//! readings return.
//!
//! ## Handling Strategy
//!
//! ```rust
//! use dewguard_core::{ControlError, ValidationError};
//!
//! fn status_code(err: &ControlError) -> u16 {
//!     match err {
//!         ControlError::Validation(_) => 400,
//!         ControlError::SensorUnavailable { .. } => 500,
//!     }
//! }
//! # assert_eq!(status_code(&ControlError::Validation(ValidationError::InvalidMode)), 400);
//! ```

use thiserror_no_std::Error;

/// Result type for command validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for controller operations
pub type ControlResult<T> = Result<T, ControlError>;

/// Rejected output command - nothing was mutated
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// A field required for the requested mode is missing
    #[error("Missing required parameter: `{field}`")]
    MissingField {
        /// Wire name of the field
        field: &'static str,
    },

    /// A numeric field is outside its accepted range
    #[error("Value {value} for `{field}` outside range [{min}, {max}]")]
    OutOfRange {
        /// Wire name of the field
        field: &'static str,
        /// Submitted value
        value: f32,
        /// Inclusive lower bound
        min: f32,
        /// Inclusive upper bound
        max: f32,
    },

    /// Channel index does not exist on this device
    #[error("Invalid output index {index}, device has {channels} outputs")]
    InvalidIndex {
        /// Submitted index
        index: i64,
        /// Number of channels in the registry
        channels: usize,
    },

    /// Mode is not one of `off`, `fixed`, `target_temperature`, `dewpoint`
    #[error("Invalid value for `mode`. Valid choices: <off, fixed, target_temperature, dewpoint>")]
    InvalidMode,

    /// Value is NaN or infinite
    #[error("Value for `{field}` is not a number")]
    NotANumber {
        /// Wire name of the field
        field: &'static str,
    },
}

/// Controller-level failures
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ControlError {
    /// Command failed validation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Mode needs a sensor the channel doesn't have
    #[error("Output {channel}: {reason}")]
    SensorUnavailable {
        /// Channel index
        channel: u8,
        /// Which sensor is missing
        reason: &'static str,
    },
}

/// Persisted configuration failures
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Document is not valid JSON or an element has the wrong shape
    #[error("Error parsing output configuration at line {line}, column {column}")]
    Parse {
        /// 1-based line of the failure (0 when unknown)
        line: usize,
        /// 1-based column of the failure (0 when unknown)
        column: usize,
    },

    /// Document is valid JSON but not an array of outputs
    #[error("Output configuration is not an array")]
    NotAnArray,

    /// Fewer elements than channels
    #[error("Output configuration has no entry for output {index}")]
    MissingOutput {
        /// Channel index without an element
        index: usize,
    },

    /// Reading the configuration file failed
    #[cfg(feature = "std")]
    #[error("Error opening output configuration file")]
    Io,
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            line: err.line(),
            column: err.column(),
        }
    }
}

/// Any error raised by the core
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// Command or activation failure
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Persisted configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Control(ControlError::Validation(err))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ValidationError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::MissingField { field } =>
                defmt::write!(fmt, "Missing `{}`", field),
            Self::OutOfRange { field, value, min, max } =>
                defmt::write!(fmt, "`{}`={} outside [{}, {}]", field, value, min, max),
            Self::InvalidIndex { index, channels } =>
                defmt::write!(fmt, "Index {} of {}", index, channels),
            Self::InvalidMode =>
                defmt::write!(fmt, "Invalid mode"),
            Self::NotANumber { field } =>
                defmt::write!(fmt, "`{}` not a number", field),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControlError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Validation(err) => defmt::write!(fmt, "{}", err),
            Self::SensorUnavailable { channel, reason } =>
                defmt::write!(fmt, "Output {}: {}", channel, reason),
        }
    }
}
