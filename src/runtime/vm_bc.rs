use crate::bytecode::ir::Program;
use crate::bytecode::op::{Op, OpDecodeError, WsAddr, WsInt};
use crate::runtime::runtime_error::{FaultKind, RuntimeError};
use crate::runtime::stack::Stack;
use std::io::{BufRead, Write};

pub const DEFAULT_STACK_SIZE: usize = 65536;
pub const DEFAULT_HEAP_SIZE: usize = 65536;
pub const DEFAULT_CALL_STACK_SIZE: usize = 65536;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub stack_size: usize,
    pub heap_size: usize,
    pub call_stack_size: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_size: DEFAULT_STACK_SIZE,
            heap_size: DEFAULT_HEAP_SIZE,
            call_stack_size: DEFAULT_CALL_STACK_SIZE,
            max_steps: None,
        }
    }
}

/// Non-fatal events seen while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeDiagnostic {
    /// A byte that is not an opcode; execution resumed at `pc + 1`.
    UnknownOpcode { pc: usize, byte: u8 },
    /// read-number found no digits; the heap cell was left alone.
    InvalidNumberInput { pc: usize },
}

impl std::fmt::Display for RuntimeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeDiagnostic::UnknownOpcode { pc, byte } => {
                write!(f, "warning: {:04}: undefined instruction 0x{:02x}", pc, byte)
            }
            RuntimeDiagnostic::InvalidNumberInput { pc } => {
                write!(f, "warning: {:04}: input is not a number", pc)
            }
        }
    }
}

enum Flow {
    Continue,
    Halt,
}

pub struct Vm {
    config: VmConfig,
    stack: Stack<WsInt>,
    call_stack: Stack<usize>,
    heap: Vec<WsInt>,
    pc: usize,
    steps: usize,
    diagnostics: Vec<RuntimeDiagnostic>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Stack::operands(config.stack_size),
            call_stack: Stack::calls(config.call_stack_size),
            heap: Vec::new(),
            pc: 0,
            steps: 0,
            diagnostics: Vec::new(),
            config,
        }
    }

    pub fn stack(&self) -> &[WsInt] {
        self.stack.as_slice()
    }

    pub fn heap(&self) -> &[WsInt] {
        &self.heap
    }

    pub fn diagnostics(&self) -> &[RuntimeDiagnostic] {
        &self.diagnostics
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn reset_execution_state(&mut self) {
        self.stack.clear();
        self.call_stack.clear();
        self.heap = vec![0; self.config.heap_size];
        self.pc = 0;
        self.steps = 0;
        self.diagnostics.clear();
    }

    /// Executes `prog` from offset 0 with fresh stacks and heap. Stops at a
    /// halt record or when the program counter leaves the bytecode.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        prog: &Program,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), RuntimeError> {
        self.reset_execution_state();
        log::debug!("running {} bytes of bytecode", prog.len());

        let result = self.exec(&prog.bytecode, input, output);
        let flushed = output.flush();
        result?;
        flushed.map_err(|e| RuntimeError::new(e.into(), self.pc))?;

        log::debug!("halted after {} steps", self.steps);
        Ok(())
    }

    fn exec<R: BufRead, W: Write>(
        &mut self,
        bytecode: &[u8],
        input: &mut R,
        output: &mut W,
    ) -> Result<(), RuntimeError> {
        while self.pc < bytecode.len() {
            let at = self.pc;
            match self.step(bytecode, input, output) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => break,
                Err(kind) => return Err(RuntimeError::new(kind, at)),
            }
        }
        Ok(())
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), FaultKind> {
        self.steps += 1;

        if let Some(limit) = self.config.max_steps {
            if self.steps > limit {
                return Err(FaultKind::StepLimit { limit });
            }
        }
        Ok(())
    }

    fn step<R: BufRead, W: Write>(
        &mut self,
        bytecode: &[u8],
        input: &mut R,
        output: &mut W,
    ) -> Result<Flow, FaultKind> {
        let at = self.pc;
        let (op, next) = match Op::decode(bytecode, at) {
            Ok(decoded) => decoded,
            Err(OpDecodeError::UnknownOpcode(byte)) => {
                let diagnostic = RuntimeDiagnostic::UnknownOpcode { pc: at, byte };
                log::warn!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
                self.pc = at + 1;
                return Ok(Flow::Continue);
            }
            Err(OpDecodeError::Truncated(opcode)) => {
                return Err(FaultKind::TruncatedOperand {
                    mnemonic: opcode.mnemonic(),
                });
            }
        };

        self.check_limits()?;
        log::trace!("{:04}: {} {:?}", at, op, self.stack);
        self.pc = next;

        match op {
            Op::Halt => return Ok(Flow::Halt),

            // Stack operations
            Op::Push(n) => self.stack.push(n)?,
            Op::DupN(n) => {
                let v = self.stack.peek(stack_index(n)?)?;
                self.stack.push(v)?;
            }
            Op::Dup => {
                let v = self.stack.peek(0)?;
                self.stack.push(v)?;
            }
            Op::Slide(n) => self.stack.slide(stack_index(n)?)?,
            Op::Swap => {
                let (b, a) = self.stack.pop_2()?;
                self.stack.push(a)?;
                self.stack.push(b)?;
            }
            Op::Discard => {
                self.stack.pop()?;
            }

            // Arithmetic: `a` is the top, the result is `b OP a`
            Op::Add => {
                let (b, a) = self.stack.pop_2()?;
                self.stack.push(b.wrapping_add(a))?;
            }
            Op::Sub => {
                let (b, a) = self.stack.pop_2()?;
                self.stack.push(b.wrapping_sub(a))?;
            }
            Op::Mul => {
                let (b, a) = self.stack.pop_2()?;
                self.stack.push(b.wrapping_mul(a))?;
            }
            Op::Div => {
                let (b, a) = self.stack.pop_2()?;
                if a == 0 {
                    return Err(FaultKind::DivisionByZero);
                }
                self.stack.push(b.wrapping_div(a))?;
            }
            Op::Mod => {
                let (b, a) = self.stack.pop_2()?;
                if a == 0 {
                    return Err(FaultKind::ModuloByZero);
                }
                self.stack.push(b.wrapping_rem(a))?;
            }

            // Heap
            Op::Store => {
                let (address, value) = self.stack.pop_2()?;
                let cell = self.heap_index(address)?;
                self.heap[cell] = value;
            }
            Op::Load => {
                let address = self.stack.pop()?;
                let cell = self.heap_index(address)?;
                self.stack.push(self.heap[cell])?;
            }

            // Flow control
            Op::Label => {}
            Op::Call(target) => {
                self.call_stack.push(next)?;
                self.jump(target);
            }
            Op::Jump(target) => self.jump(target),
            Op::JumpIfZero(target) => {
                if self.stack.pop()? == 0 {
                    self.jump(target);
                }
            }
            Op::JumpIfNeg(target) => {
                if self.stack.pop()? < 0 {
                    self.jump(target);
                }
            }
            Op::Return => self.pc = self.call_stack.pop()?,

            // I/O
            Op::PutChar => {
                let v = self.stack.pop()?;
                output.write_all(&[v as u8])?;
            }
            Op::PutNum => {
                let v = self.stack.pop()?;
                write!(output, "{}", v)?;
            }
            Op::ReadChar => {
                let address = self.stack.pop()?;
                let cell = self.heap_index(address)?;
                output.flush()?;
                self.heap[cell] = read_byte(input)?.map_or(-1, WsInt::from);
            }
            Op::ReadNum => {
                let address = self.stack.pop()?;
                let cell = self.heap_index(address)?;
                output.flush()?;
                match read_number(input)? {
                    Some(n) => self.heap[cell] = n,
                    None => {
                        let diagnostic = RuntimeDiagnostic::InvalidNumberInput { pc: at };
                        log::warn!("{}", diagnostic);
                        self.diagnostics.push(diagnostic);
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn jump(&mut self, target: WsAddr) {
        self.pc = target as usize;
    }

    fn heap_index(&self, address: WsInt) -> Result<usize, FaultKind> {
        usize::try_from(address)
            .ok()
            .filter(|&cell| cell < self.heap.len())
            .ok_or(FaultKind::HeapOutOfRange {
                address,
                capacity: self.heap.len(),
            })
    }
}

fn stack_index(n: WsInt) -> Result<usize, FaultKind> {
    usize::try_from(n).map_err(|_| FaultKind::NegativeStackIndex(n))
}

// =============================================================================
// Input helpers
// =============================================================================

fn peek_byte<R: BufRead>(input: &mut R) -> std::io::Result<Option<u8>> {
    Ok(input.fill_buf()?.first().copied())
}

fn read_byte<R: BufRead>(input: &mut R) -> std::io::Result<Option<u8>> {
    let byte = peek_byte(input)?;
    if byte.is_some() {
        input.consume(1);
    }
    Ok(byte)
}

/// Skips leading whitespace, then reads an optionally signed decimal.
/// Returns `None` when no digit follows. Overflow wraps.
fn read_number<R: BufRead>(input: &mut R) -> std::io::Result<Option<WsInt>> {
    while let Some(b) = peek_byte(input)? {
        if !b.is_ascii_whitespace() {
            break;
        }
        input.consume(1);
    }

    let negative = match peek_byte(input)? {
        Some(b'-') => true,
        Some(b'+') => false,
        _ => return read_digits(input),
    };
    input.consume(1);
    Ok(read_digits(input)?.map(|n| if negative { n.wrapping_neg() } else { n }))
}

fn read_digits<R: BufRead>(input: &mut R) -> std::io::Result<Option<WsInt>> {
    let mut value: Option<WsInt> = None;
    while let Some(b) = peek_byte(input)? {
        if !b.is_ascii_digit() {
            break;
        }
        input.consume(1);
        let digit = WsInt::from(b - b'0');
        value = Some(value.unwrap_or(0).wrapping_mul(10).wrapping_add(digit));
    }
    Ok(value)
}

// =============================================================================
// Tests
// =============================================================================
