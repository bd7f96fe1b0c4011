use crate::bytecode::op::WsAddr;
use crate::frontend::DecodeError;

/// Non-fatal findings collected while compiling one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Unknown command or truncated instruction; nothing was emitted.
    Decode(DecodeError),
    /// A label defined twice. The first address wins.
    DuplicateLabel {
        position: usize,
        label: String,
        address: WsAddr,
    },
    /// Referenced but never defined. Its operands were left as zero.
    UndefinedLabel { label: String, sites: Vec<usize> },
}

impl Diagnostic {
    /// Errors prevent the program from running; everything else is a warning.
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::UndefinedLabel { .. })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Decode(e) => write!(f, "warning: {}", e),
            Diagnostic::DuplicateLabel {
                position,
                label,
                address,
            } => write!(
                f,
                "warning: token {}: duplicate label definition '{}' (keeping address {})",
                position, label, address
            ),
            Diagnostic::UndefinedLabel { label, sites } => {
                write!(
                    f,
                    "error: undefined label '{}' referenced {} time{}",
                    label,
                    sites.len(),
                    if sites.len() == 1 { "" } else { "s" }
                )?;
                write!(f, "\n  hint: add a mark instruction for '{}'", label)
            }
        }
    }
}

impl From<DecodeError> for Diagnostic {
    fn from(e: DecodeError) -> Self {
        Diagnostic::Decode(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The bytecode would grow past the configured capacity.
    BytecodeOverflow { capacity: usize },
    /// Branch or call targets that were never defined.
    UndefinedLabels(Vec<String>),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::BytecodeOverflow { capacity } => write!(
                f,
                "compile error: bytecode exceeds the buffer capacity of {} bytes",
                capacity
            ),
            CompileError::UndefinedLabels(labels) => {
                write!(f, "compile error: undefined label")?;
                if labels.len() > 1 {
                    write!(f, "s")?;
                }
                let quoted: Vec<String> = labels.iter().map(|l| format!("'{}'", l)).collect();
                write!(f, " {}", quoted.join(", "))
            }
        }
    }
}

impl std::error::Error for CompileError {}
