//! Error types for the onboarding engine.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Journey error: {0}")]
    Journey(#[from] JourneyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the flow engine when an operation does not fit the
/// current state, or when a step table is malformed.
///
/// Validation failures are not here: they are reported back to the user as
/// assistant dialogue (see [`ValidationError`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid flow definition {flow}: {reason}")]
    InvalidDefinition { flow: String, reason: String },

    #[error("Step {step} is not defined")]
    UnknownStep { step: String },

    #[error("Step {step} does not accept {operation}")]
    WrongStepKind { step: String, operation: &'static str },

    #[error("Still waiting for the assistant at step {step}")]
    AwaitingAssistant { step: String },

    #[error("Flow is {status}, operation not allowed")]
    NotActive { status: String },

    #[error("Input is empty")]
    EmptyInput,

    #[error("Unknown choice {value} at step {step}")]
    UnknownChoice { step: String, value: String },

    #[error("Field {field} is already set")]
    FieldAlreadySet { field: String },

    #[error("Field {field} was never collected")]
    MissingField { field: String },

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Flow {flow} does not support third-party sign-in")]
    SignInUnsupported { flow: String },
}

/// A rejected free-text answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is empty")]
    Empty { field: &'static str },

    #[error("{field} is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: &'static str, min: i64, max: i64 },
}

/// Persistence and sign-in backend errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Save rejected: {0}")]
    Rejected(String),

    #[error("{provider} sign-in failed: {reason}")]
    SignIn { provider: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Screen-level navigation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JourneyError {
    #[error("Cannot {action} from the {screen} screen")]
    InvalidAction { screen: String, action: String },

    #[error("No signed-in user")]
    NotSignedIn,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
