//! VM error and result types

use crate::log::LogRecord;
use crate::storage::StorageError;
use fugue_primitives::ArithmeticError;
use thiserror::Error;

/// Execution errors; every one of these halts the current call fatally
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Pop or window access on too few stack items
    #[error("stack underflow")]
    StackUnderflow,

    /// Push past the fixed stack depth
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Jump to an offset that does not hold the jump-landing marker
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Unrecognized or deliberately unimplemented operation
    #[error("unsupported opcode: 0x{0:02x}")]
    UnsupportedOpcode(u8),

    /// Nesting past the fixed call depth
    #[error("call depth exceeded (max 1024)")]
    CallDepthExceeded,

    /// Call or code access against an address outside the registry
    #[error("unknown contract address: {0}")]
    UnknownContract(usize),

    /// An offset or size operand that does not fit the host address space
    #[error("invalid memory access")]
    InvalidMemoryAccess,

    /// Raw arithmetic failure escaping the primitive layer
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    /// Storage contract violation
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for VM operations
pub type VmResult<T> = Result<T, VmError>;

/// How a call left the Running state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// STOP, RETURN, or the end of the code: mutations commit
    Success,
    /// REVERT: storage and memory restored to the call-entry snapshot
    Revert,
    /// A typed execution failure; state restored as for revert
    Fatal(VmError),
}

impl HaltReason {
    /// Check whether the call committed its mutations
    pub fn is_success(&self) -> bool {
        matches!(self, HaltReason::Success)
    }
}

/// The observable outcome of one top-level call
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// How execution halted
    pub status: HaltReason,
    /// Return data captured by RETURN (empty otherwise)
    pub output: Vec<u8>,
    /// Log records in emission order, across all nested calls
    pub logs: Vec<LogRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", VmError::StackUnderflow), "stack underflow");
        assert_eq!(
            format!("{}", VmError::StackOverflow),
            "stack overflow (max 1024)"
        );
        assert_eq!(
            format!("{}", VmError::InvalidJump(100)),
            "invalid jump destination: 100"
        );
        assert_eq!(
            format!("{}", VmError::UnsupportedOpcode(0xFE)),
            "unsupported opcode: 0xfe"
        );
        assert_eq!(
            format!("{}", VmError::CallDepthExceeded),
            "call depth exceeded (max 1024)"
        );
        assert_eq!(
            format!("{}", VmError::UnknownContract(7)),
            "unknown contract address: 7"
        );
    }

    #[test]
    fn test_arithmetic_error_is_transparent() {
        let err = VmError::from(ArithmeticError::DivisionByZero);
        assert_eq!(format!("{err}"), "division by zero");
    }

    #[test]
    fn test_halt_reason() {
        assert!(HaltReason::Success.is_success());
        assert!(!HaltReason::Revert.is_success());
        assert!(!HaltReason::Fatal(VmError::StackUnderflow).is_success());
    }
}
