/// Value type of the operand stack and heap.
pub type WsInt = i32;
/// Bytecode offset type used by branch and call operands.
pub type WsAddr = u32;

pub const INT_WIDTH: usize = std::mem::size_of::<WsInt>();
pub const ADDR_WIDTH: usize = std::mem::size_of::<WsAddr>();

// =============================================================================
// OPCODE - one byte per record
// =============================================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Halt = 0x00,

    // stack
    Push = 0x01,
    DupN = 0x02,
    Dup = 0x03,
    Slide = 0x04,
    Swap = 0x05,
    Discard = 0x06,

    // arithmetic
    Add = 0x07,
    Sub = 0x08,
    Mul = 0x09,
    Div = 0x0a,
    Mod = 0x0b,

    // heap
    Store = 0x0c,
    Load = 0x0d,

    // flow
    Label = 0x0e,
    Call = 0x0f,
    Jump = 0x10,
    JumpIfZero = 0x11,
    JumpIfNeg = 0x12,
    Return = 0x13,

    // I/O
    PutChar = 0x14,
    PutNum = 0x15,
    ReadChar = 0x16,
    ReadNum = 0x17,
}

/// What follows an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Int,
    Addr,
}

impl Operand {
    pub fn width(self) -> usize {
        match self {
            Operand::None => 0,
            Operand::Int => INT_WIDTH,
            Operand::Addr => ADDR_WIDTH,
        }
    }
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match b {
            0x00 => Halt,
            0x01 => Push,
            0x02 => DupN,
            0x03 => Dup,
            0x04 => Slide,
            0x05 => Swap,
            0x06 => Discard,
            0x07 => Add,
            0x08 => Sub,
            0x09 => Mul,
            0x0a => Div,
            0x0b => Mod,
            0x0c => Store,
            0x0d => Load,
            0x0e => Label,
            0x0f => Call,
            0x10 => Jump,
            0x11 => JumpIfZero,
            0x12 => JumpIfNeg,
            0x13 => Return,
            0x14 => PutChar,
            0x15 => PutNum,
            0x16 => ReadChar,
            0x17 => ReadNum,
            _ => return None,
        })
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn operand(self) -> Operand {
        use Opcode::*;
        match self {
            Push | DupN | Slide => Operand::Int,
            Call | Jump | JumpIfZero | JumpIfNeg => Operand::Addr,
            _ => Operand::None,
        }
    }

    /// Total record size: opcode byte plus operand.
    pub fn width(self) -> usize {
        1 + self.operand().width()
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Halt => "FLOW_HALT",
            Push => "STACK_PUSH",
            DupN => "STACK_DUP_N",
            Dup => "STACK_DUP",
            Slide => "STACK_SLIDE",
            Swap => "STACK_SWAP",
            Discard => "STACK_POP",
            Add => "ARITH_ADD",
            Sub => "ARITH_SUB",
            Mul => "ARITH_MUL",
            Div => "ARITH_DIV",
            Mod => "ARITH_MOD",
            Store => "HEAP_STORE",
            Load => "HEAP_LOAD",
            Label => "FLOW_LABEL",
            Call => "FLOW_GOSUB",
            Jump => "FLOW_JUMP",
            JumpIfZero => "FLOW_BEZ",
            JumpIfNeg => "FLOW_BLTZ",
            Return => "FLOW_ENDSUB",
            PutChar => "IO_PUT_CHAR",
            PutNum => "IO_PUT_NUM",
            ReadChar => "IO_READ_CHAR",
            ReadNum => "IO_READ_NUM",
        }
    }
}

// =============================================================================
// OP - a decoded record
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Halt,

    Push(WsInt),
    DupN(WsInt),
    Dup,
    Slide(WsInt),
    Swap,
    Discard,

    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Store,
    Load,

    /// Never emitted by the compiler; a no-op at runtime.
    Label,
    Call(WsAddr),
    Jump(WsAddr),
    JumpIfZero(WsAddr),
    JumpIfNeg(WsAddr),
    Return,

    PutChar,
    PutNum,
    ReadChar,
    ReadNum,
}

/// Why a record at some offset could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpDecodeError {
    UnknownOpcode(u8),
    /// The operand runs past the end of the bytecode.
    Truncated(Opcode),
}

impl Op {
    /// Decodes the record starting at `at`, which must be in bounds.
    /// Returns the op and the offset of the next record.
    pub fn decode(bytecode: &[u8], at: usize) -> Result<(Op, usize), OpDecodeError> {
        let byte = bytecode[at];
        let opcode = Opcode::from_byte(byte).ok_or(OpDecodeError::UnknownOpcode(byte))?;
        let next = at + opcode.width();
        if next > bytecode.len() {
            return Err(OpDecodeError::Truncated(opcode));
        }
        let operand = &bytecode[at + 1..next];
        let int = || read_int(operand);
        let addr = || read_addr(operand);

        use Opcode::*;
        let op = match opcode {
            Halt => Op::Halt,
            Push => Op::Push(int()),
            DupN => Op::DupN(int()),
            Dup => Op::Dup,
            Slide => Op::Slide(int()),
            Swap => Op::Swap,
            Discard => Op::Discard,
            Add => Op::Add,
            Sub => Op::Sub,
            Mul => Op::Mul,
            Div => Op::Div,
            Mod => Op::Mod,
            Store => Op::Store,
            Load => Op::Load,
            Label => Op::Label,
            Call => Op::Call(addr()),
            Jump => Op::Jump(addr()),
            JumpIfZero => Op::JumpIfZero(addr()),
            JumpIfNeg => Op::JumpIfNeg(addr()),
            Return => Op::Return,
            PutChar => Op::PutChar,
            PutNum => Op::PutNum,
            ReadChar => Op::ReadChar,
            ReadNum => Op::ReadNum,
        };
        Ok((op, next))
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Op::Halt => Opcode::Halt,
            Op::Push(_) => Opcode::Push,
            Op::DupN(_) => Opcode::DupN,
            Op::Dup => Opcode::Dup,
            Op::Slide(_) => Opcode::Slide,
            Op::Swap => Opcode::Swap,
            Op::Discard => Opcode::Discard,
            Op::Add => Opcode::Add,
            Op::Sub => Opcode::Sub,
            Op::Mul => Opcode::Mul,
            Op::Div => Opcode::Div,
            Op::Mod => Opcode::Mod,
            Op::Store => Opcode::Store,
            Op::Load => Opcode::Load,
            Op::Label => Opcode::Label,
            Op::Call(_) => Opcode::Call,
            Op::Jump(_) => Opcode::Jump,
            Op::JumpIfZero(_) => Opcode::JumpIfZero,
            Op::JumpIfNeg(_) => Opcode::JumpIfNeg,
            Op::Return => Opcode::Return,
            Op::PutChar => Opcode::PutChar,
            Op::PutNum => Opcode::PutNum,
            Op::ReadChar => Opcode::ReadChar,
            Op::ReadNum => Opcode::ReadNum,
        }
    }

    /// Appends the record to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode().byte());
        match *self {
            Op::Push(n) | Op::DupN(n) | Op::Slide(n) => out.extend_from_slice(&int_bytes(n)),
            Op::Call(a) | Op::Jump(a) | Op::JumpIfZero(a) | Op::JumpIfNeg(a) => {
                out.extend_from_slice(&addr_bytes(a))
            }
            _ => {}
        }
    }

    /// Branch or call target, if this op has one.
    pub fn target(&self) -> Option<WsAddr> {
        match self {
            Op::Call(a) | Op::Jump(a) | Op::JumpIfZero(a) | Op::JumpIfNeg(a) => Some(*a),
            _ => None,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.opcode().mnemonic();
        match self {
            Op::Push(n) | Op::DupN(n) | Op::Slide(n) => write!(f, "{} {}", name, n),
            Op::Call(a) | Op::Jump(a) | Op::JumpIfZero(a) | Op::JumpIfNeg(a) => {
                write!(f, "{} {}", name, a)
            }
            _ => write!(f, "{}", name),
        }
    }
}

/// Encodes a sequence of ops into flat bytecode.
pub fn assemble(ops: &[Op]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        op.encode(&mut out);
    }
    out
}

// Operands are stored in host byte order.

pub fn int_bytes(value: WsInt) -> [u8; INT_WIDTH] {
    value.to_ne_bytes()
}

pub fn addr_bytes(value: WsAddr) -> [u8; ADDR_WIDTH] {
    value.to_ne_bytes()
}

fn read_int(bytes: &[u8]) -> WsInt {
    let mut raw = [0u8; INT_WIDTH];
    raw.copy_from_slice(&bytes[..INT_WIDTH]);
    WsInt::from_ne_bytes(raw)
}

fn read_addr(bytes: &[u8]) -> WsAddr {
    let mut raw = [0u8; ADDR_WIDTH];
    raw.copy_from_slice(&bytes[..ADDR_WIDTH]);
    WsAddr::from_ne_bytes(raw)
}
