// src/form.rs

use std::fmt;
use thiserror::Error;
use validator::Validate;

use crate::client::AnalysisBackend;
use crate::controller::{FetchController, FetchState, RequestId};
use crate::error::ValidationError;

pub const MAX_SYMBOL_LEN: u64 = 32;

#[derive(Validate)]
struct SymbolInput {
    #[validate(length(min = 1, max = 32))]
    value: String,
}

/// Ticker symbol as typed by the user, trimmed and known to be non-empty.
///
/// Case is preserved; the backend decides how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = SymbolInput {
            value: input.trim().to_string(),
        };

        if input.validate().is_err() {
            return Err(if input.value.is_empty() {
                ValidationError::Empty
            } else {
                ValidationError::TooLong {
                    max: MAX_SYMBOL_LEN,
                }
            });
        }
        if input
            .value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ValidationError::InvalidCharacters);
        }

        Ok(Symbol(input.value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Still analyzing the previous symbol ({0})")]
    Busy(RequestId),
}

// Symbol input box; submission stays disabled while a request is in flight
#[derive(Debug, Default)]
pub struct SymbolForm {
    symbol: String,
}

impl SymbolForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_symbol(&mut self, value: impl Into<String>) {
        self.symbol = value.into();
    }

    pub fn is_enabled<B: AnalysisBackend>(&self, controller: &FetchController<B>) -> bool {
        !controller.state().is_loading()
    }

    /// Validate the current input and hand it to the controller.
    ///
    /// Invalid input never reaches the controller.
    pub fn submit<B: AnalysisBackend>(
        &mut self,
        controller: &mut FetchController<B>,
    ) -> Result<RequestId, SubmitError> {
        let symbol = Symbol::parse(&self.symbol)?;
        if let FetchState::Loading(pending) = controller.state() {
            return Err(SubmitError::Busy(*pending));
        }
        Ok(controller.submit(symbol))
    }
}
