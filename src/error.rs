//! Error types.
//!
//! - `FitError`: failures of the seasonal curve fitter (pure, no I/O)
//! - `AppError`: what the binary reports; carries the process exit code
//!
//! Exit codes: 2 = usage/input/configuration, 3 = insufficient data,
//! 4 = fitting, numerical or network failure.

use thiserror::Error;

/// Errors raised by the seasonal curve fitter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer observations than the model needs.
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The optimizer did not reach any stopping criterion within its budget.
    #[error("fit did not converge after {iterations} iterations (sse={sse:.6e})")]
    Convergence { iterations: usize, sse: f64 },

    /// Non-finite inputs that make the objective undefined.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Month outside 1..=12 or repeated.
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = match err {
            FitError::InsufficientData { .. } => 3,
            _ => 4,
        };
        AppError::new(code, format!("Seasonal fit failed: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
