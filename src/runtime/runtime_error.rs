use crate::bytecode::op::WsInt;

/// What went wrong in a fatal fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    StackUnderflow,
    StackOverflow { capacity: usize },
    /// Negative dup-n or slide operand.
    NegativeStackIndex(WsInt),
    CallStackUnderflow,
    CallStackOverflow { capacity: usize },
    HeapOutOfRange { address: WsInt, capacity: usize },
    DivisionByZero,
    ModuloByZero,
    TruncatedOperand { mnemonic: &'static str },
    StepLimit { limit: usize },
    Io(String),
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::StackUnderflow => write!(f, "stack underflow"),
            FaultKind::StackOverflow { capacity } => {
                write!(f, "stack overflow (capacity {})", capacity)
            }
            FaultKind::NegativeStackIndex(n) => write!(f, "negative stack index {}", n),
            FaultKind::CallStackUnderflow => write!(f, "return with an empty call stack"),
            FaultKind::CallStackOverflow { capacity } => {
                write!(f, "call stack overflow (capacity {})", capacity)
            }
            FaultKind::HeapOutOfRange { address, capacity } => write!(
                f,
                "heap address {} out of range (heap has {} cells)",
                address, capacity
            ),
            FaultKind::DivisionByZero => write!(f, "division by zero"),
            FaultKind::ModuloByZero => write!(f, "modulo by zero"),
            FaultKind::TruncatedOperand { mnemonic } => {
                write!(f, "operand of {} runs past the end of the bytecode", mnemonic)
            }
            FaultKind::StepLimit { limit } => {
                write!(f, "execution step limit exceeded ({})", limit)
            }
            FaultKind::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: FaultKind,
    /// Offset of the record that faulted.
    pub pc: usize,
}

impl RuntimeError {
    pub fn new(kind: FaultKind, pc: usize) -> Self {
        RuntimeError { kind, pc }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error at {:04}: {}", self.pc, self.kind)
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for FaultKind {
    fn from(e: std::io::Error) -> Self {
        FaultKind::Io(e.to_string())
    }
}
