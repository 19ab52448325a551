use crate::isa::Arity;
use asm_interpreter_derive::Error;

/// Errors that can occur while parsing or executing a program.
///
/// Parse-time variants carry the 1-based line and column of the offending
/// token; run-time variants carry the 1-based line of the failing
/// instruction. Any run-time error aborts the run immediately.
#[derive(Debug, Error)]
pub enum VmError {
    /// Mnemonic that matches nothing in the instruction set.
    #[error("line {line}:{column}: unknown opcode `{mnemonic}`")]
    UnknownOpcode {
        line: usize,
        column: usize,
        mnemonic: String,
    },
    /// Wrong number of operands for an opcode.
    #[error("line {line}:{column}: {mnemonic} expects {expected} operands, got {actual}")]
    OperandCountMismatch {
        line: usize,
        column: usize,
        mnemonic: &'static str,
        expected: Arity,
        actual: usize,
    },
    /// Operand of the wrong kind for its position.
    #[error("line {line}:{column}: {mnemonic} operand must be {expected}, got {actual}")]
    OperandTypeMismatch {
        line: usize,
        column: usize,
        mnemonic: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    /// Numeric-looking literal whose value does not fit an `i64`.
    #[error("line {line}:{column}: integer literal `{literal}` does not fit in 64 bits")]
    IntegerOutOfRange {
        line: usize,
        column: usize,
        literal: String,
    },
    /// Label defined more than once.
    #[error("line {line}:{column}: duplicate label `{label}`")]
    DuplicateLabel {
        line: usize,
        column: usize,
        label: String,
    },
    /// Register read before anything was written to it.
    #[error("line {line}: register `{name}` read before it was written")]
    UndefinedRegister { line: usize, name: String },
    /// Jump, branch, or call to a label that is never defined.
    #[error("line {line}: undefined label `{label}`")]
    UndefinedLabel { line: usize, label: String },
    /// `RET` with an empty call stack.
    #[error("line {line}: RET with no pending CALL")]
    ReturnWithoutCall { line: usize },
    /// Division with a zero divisor.
    #[error("line {line}: division by zero")]
    DivisionByZero { line: usize },
    /// Conditional jump before any `CMP` has executed.
    #[error("line {line}: {mnemonic} executed before any CMP")]
    BranchWithoutCompare { line: usize, mnemonic: &'static str },
    /// The caller-imposed step budget ran out.
    #[error("step limit of {limit} lines exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Failed to read a source file.
    #[error("{path}: {reason}")]
    IoError { path: String, reason: String },
}

impl VmError {
    /// Source position of the error, when it maps to one.
    ///
    /// Parse errors point at the offending token; run-time errors point at
    /// the start of the failing line. Used for diagnostic rendering.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            VmError::UnknownOpcode { line, column, .. }
            | VmError::OperandCountMismatch { line, column, .. }
            | VmError::OperandTypeMismatch { line, column, .. }
            | VmError::IntegerOutOfRange { line, column, .. }
            | VmError::DuplicateLabel { line, column, .. } => Some((*line, *column)),
            VmError::UndefinedRegister { line, .. }
            | VmError::UndefinedLabel { line, .. }
            | VmError::ReturnWithoutCall { line }
            | VmError::DivisionByZero { line }
            | VmError::BranchWithoutCompare { line, .. } => Some((*line, 1)),
            VmError::StepLimitExceeded { .. } | VmError::IoError { .. } => None,
        }
    }
}
