use crate::bytecode::compile_error::{CompileError, Diagnostic};
use crate::bytecode::ir::Program;
use crate::bytecode::labels::{Definition, LabelTable};
use crate::bytecode::op::{ADDR_WIDTH, Opcode, WsAddr, WsInt, addr_bytes, int_bytes};
use crate::frontend::{Decoded, Decoder, Instr, TokenBuffer};

/// Upper bound on emitted bytecode, in bytes.
pub const DEFAULT_MAX_BYTECODE_SIZE: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub max_bytecode_size: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_bytecode_size: DEFAULT_MAX_BYTECODE_SIZE,
        }
    }
}

/// Single-pass compiler. Branches to labels not yet seen get a zeroed
/// operand that is patched when the label is defined.
pub struct Compiler {
    config: CompilerConfig,

    /// Output buffer, append-only except for patching address operands
    bytecode: Vec<u8>,

    /// Lives for one compilation only
    labels: LabelTable,

    diagnostics: Vec<Diagnostic>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            bytecode: Vec::new(),
            labels: LabelTable::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Compiles a whole token buffer. Only running out of bytecode space is
    /// fatal; decode and label problems end up in `Program::diagnostics`.
    pub fn compile(mut self, tokens: &TokenBuffer) -> Result<Program, CompileError> {
        for decoded in Decoder::new(tokens) {
            match decoded {
                Ok(decoded) => self.compile_instr(decoded)?,
                Err(e) => self.report(e.into()),
            }
        }
        Ok(self.finish())
    }

    fn compile_instr(&mut self, decoded: Decoded) -> Result<(), CompileError> {
        match decoded.instr {
            // stack
            Instr::Push(n) => self.emit_int(Opcode::Push, n),
            Instr::DupN(n) => self.emit_int(Opcode::DupN, n),
            Instr::Dup => self.emit_int(Opcode::DupN, 0),
            Instr::Slide(n) => self.emit_int(Opcode::Slide, n),
            Instr::Swap => self.emit(Opcode::Swap),
            Instr::Discard => self.emit(Opcode::Discard),

            // arithmetic
            Instr::Add => self.emit(Opcode::Add),
            Instr::Sub => self.emit(Opcode::Sub),
            Instr::Mul => self.emit(Opcode::Mul),
            Instr::Div => self.emit(Opcode::Div),
            Instr::Mod => self.emit(Opcode::Mod),

            // heap
            Instr::Store => self.emit(Opcode::Store),
            Instr::Load => self.emit(Opcode::Load),

            // flow
            Instr::Mark(name) => self.define_label(&name, decoded.position),
            Instr::Call(name) => self.emit_branch(Opcode::Call, &name),
            Instr::Jump(name) => self.emit_branch(Opcode::Jump, &name),
            Instr::JumpIfZero(name) => self.emit_branch(Opcode::JumpIfZero, &name),
            Instr::JumpIfNeg(name) => self.emit_branch(Opcode::JumpIfNeg, &name),
            Instr::Return => self.emit(Opcode::Return),
            Instr::Halt => self.emit(Opcode::Halt),

            // I/O
            Instr::PutChar => self.emit(Opcode::PutChar),
            Instr::PutNum => self.emit(Opcode::PutNum),
            Instr::ReadChar => self.emit(Opcode::ReadChar),
            Instr::ReadNum => self.emit(Opcode::ReadNum),
        }
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn reserve(&mut self, opcode: Opcode) -> Result<(), CompileError> {
        if self.bytecode.len() + opcode.width() > self.config.max_bytecode_size {
            return Err(CompileError::BytecodeOverflow {
                capacity: self.config.max_bytecode_size,
            });
        }
        Ok(())
    }

    fn emit(&mut self, opcode: Opcode) -> Result<(), CompileError> {
        self.reserve(opcode)?;
        self.bytecode.push(opcode.byte());
        Ok(())
    }

    fn emit_int(&mut self, opcode: Opcode, value: WsInt) -> Result<(), CompileError> {
        self.reserve(opcode)?;
        self.bytecode.push(opcode.byte());
        self.bytecode.extend_from_slice(&int_bytes(value));
        Ok(())
    }

    fn emit_branch(&mut self, opcode: Opcode, label: &str) -> Result<(), CompileError> {
        self.reserve(opcode)?;
        self.bytecode.push(opcode.byte());
        let site = self.bytecode.len();
        // unresolved targets stay zero until the definition patches them
        let addr = self.labels.reference(label, site).unwrap_or(0);
        self.bytecode.extend_from_slice(&addr_bytes(addr));
        Ok(())
    }

    /// Offset the next record will be written at.
    fn here(&self) -> Result<WsAddr, CompileError> {
        WsAddr::try_from(self.bytecode.len()).map_err(|_| CompileError::BytecodeOverflow {
            capacity: WsAddr::MAX as usize,
        })
    }

    // =========================================================================
    // Labels
    // =========================================================================

    fn define_label(&mut self, label: &str, position: usize) -> Result<(), CompileError> {
        let addr = self.here()?;
        match self.labels.define(label, addr) {
            Definition::Fresh => {}
            Definition::Patch(sites) => {
                log::trace!("label '{}' patches {} site(s) -> {}", label, sites.len(), addr);
                for site in sites {
                    self.bytecode[site..site + ADDR_WIDTH].copy_from_slice(&addr_bytes(addr));
                }
            }
            Definition::Duplicate(first) => self.report(Diagnostic::DuplicateLabel {
                position,
                label: label.to_string(),
                address: first,
            }),
        }
        Ok(())
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn finish(mut self) -> Program {
        let labels = std::mem::take(&mut self.labels);
        let (resolved, pending) = labels.finish();
        for (label, sites) in pending {
            self.report(Diagnostic::UndefinedLabel { label, sites });
        }
        log::debug!(
            "compiled {} bytes, {} labels, {} diagnostics",
            self.bytecode.len(),
            resolved.len(),
            self.diagnostics.len()
        );
        Program {
            bytecode: self.bytecode,
            labels: resolved.into_iter().collect(),
            diagnostics: self.diagnostics,
        }
    }
}
