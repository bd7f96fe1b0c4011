pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod labels;
pub mod op;

pub use compile::{Compiler, CompilerConfig, DEFAULT_MAX_BYTECODE_SIZE};
pub use compile_error::{CompileError, Diagnostic};
pub use ir::{ImageError, Program};
pub use op::{Op, Opcode, WsAddr, WsInt};
