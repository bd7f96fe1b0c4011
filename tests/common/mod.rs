#![allow(dead_code)]

use blankspace::bytecode::{Compiler, Program};
use blankspace::frontend::TokenBuffer;
use blankspace::frontend::token_dumper::encode_visible;
use blankspace::runtime::{RuntimeError, Vm};

/// Whitespace source from `S`/`T`/`L` letters. Anything else is layout.
pub fn source(letters: &str) -> Vec<u8> {
    encode_visible(letters.replace('L', "\n").as_bytes())
}

pub fn compile(letters: &str) -> Program {
    compile_bytes(&source(letters))
}

pub fn compile_bytes(raw: &[u8]) -> Program {
    let tokens = TokenBuffer::from_bytes(raw, 1 << 16).expect("source should fit");
    Compiler::new().compile(&tokens).expect("compile should succeed")
}

pub fn exec(prog: &Program, input: &str) -> (Result<(), RuntimeError>, String) {
    prog.ensure_linked().expect("all labels should be defined");
    let mut out = Vec::new();
    let result = Vm::new().run(prog, &mut input.as_bytes(), &mut out);
    (result, String::from_utf8_lossy(&out).into_owned())
}

pub fn run_with_input(letters: &str, input: &str) -> String {
    let (result, out) = exec(&compile(letters), input);
    result.expect("execution should succeed");
    out
}

pub fn run(letters: &str) -> String {
    run_with_input(letters, "")
}

// Instruction letters

pub fn push(n: i32) -> String {
    let digits: String = format!("{:b}", n.unsigned_abs())
        .chars()
        .map(|c| if c == '1' { 'T' } else { 'S' })
        .collect();
    format!("SS{}{}L ", if n < 0 { 'T' } else { 'S' }, digits)
}

pub fn mark(label: &str) -> String {
    format!("LSS{}L ", label)
}

pub fn call(label: &str) -> String {
    format!("LST{}L ", label)
}

pub fn jump(label: &str) -> String {
    format!("LSL{}L ", label)
}

pub fn jump_if_zero(label: &str) -> String {
    format!("LTS{}L ", label)
}

pub fn jump_if_neg(label: &str) -> String {
    format!("LTT{}L ", label)
}

pub const DUP: &str = "SLS ";
pub const SWAP: &str = "SLT ";
pub const DISCARD: &str = "SLL ";
pub const ADD: &str = "TSSS ";
pub const SUB: &str = "TSST ";
pub const MUL: &str = "TSSL ";
pub const DIV: &str = "TSTS ";
pub const STORE: &str = "TTS ";
pub const LOAD: &str = "TTT ";
pub const RETURN: &str = "LTL ";
pub const HALT: &str = "LLL ";
pub const PUT_CHAR: &str = "TLSS ";
pub const PUT_NUM: &str = "TLST ";
pub const READ_CHAR: &str = "TLTS ";
pub const READ_NUM: &str = "TLTT ";
