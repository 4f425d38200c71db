//! Arithmetic error types

use thiserror::Error;

/// Errors raised by the raw 256-bit arithmetic primitives
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    /// Division or remainder with a zero divisor
    #[error("division by zero")]
    DivisionByZero,
}
