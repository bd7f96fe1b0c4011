use std::io::{self, Write};

use crate::bytecode::ir::Program;
use crate::bytecode::op::{Op, OpDecodeError};

const BYTES_PER_ROW: usize = 16;

/// Hex dump, 16 bytes per row. The last row is always printed, even when
/// it is empty.
pub fn write_hex<W: Write>(out: &mut W, bytecode: &[u8]) -> io::Result<()> {
    write!(out, "ADDRESS ")?;
    for col in 0..BYTES_PER_ROW {
        write!(out, " {:02x}", col)?;
    }
    writeln!(out)?;

    let mut rows = bytecode.chunks_exact(BYTES_PER_ROW);
    let mut addr = 0;
    for row in rows.by_ref() {
        write_row(out, addr, row)?;
        addr += BYTES_PER_ROW;
    }
    write_row(out, addr, rows.remainder())
}

fn write_row<W: Write>(out: &mut W, addr: usize, bytes: &[u8]) -> io::Result<()> {
    write!(out, "0x{:04x}: ", addr)?;
    for b in bytes {
        write!(out, " {:02x}", b)?;
    }
    writeln!(out)
}

/// One line per record, prefixed with its decimal offset. Labels resolved
/// to an offset are listed as `NAME:` lines just before it.
pub fn write_mnemonic<W: Write>(out: &mut W, prog: &Program) -> io::Result<()> {
    let by_addr = prog.labels_by_address();
    let mut labels = by_addr.iter().peekable();
    let bytecode = &prog.bytecode;

    let mut at = 0;
    while at < bytecode.len() {
        while let Some((_, names)) = labels.next_if(|(addr, _)| (**addr as usize) <= at) {
            for name in names {
                writeln!(out, "{}:", name)?;
            }
        }

        write!(out, "{:04}: ", at)?;
        match Op::decode(bytecode, at) {
            Ok((op, next)) => {
                writeln!(out, "{}", op)?;
                at = next;
            }
            Err(OpDecodeError::UnknownOpcode(byte)) => {
                writeln!(out, "UNDEFINED_INSTRUCTION [0x{:02x}]", byte)?;
                at += 1;
            }
            Err(OpDecodeError::Truncated(opcode)) => {
                writeln!(out, "TRUNCATED {}", opcode.mnemonic())?;
                break;
            }
        }
    }

    // labels marking the end of the program
    for (_, names) in labels {
        for name in names {
            writeln!(out, "{}:", name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::{Opcode, addr_bytes, int_bytes};
    use std::collections::BTreeMap;

    fn hex(bytecode: &[u8]) -> String {
        let mut out = Vec::new();
        write_hex(&mut out, bytecode).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn mnemonic(prog: &Program) -> String {
        let mut out = Vec::new();
        write_mnemonic(&mut out, prog).unwrap();
        String::from_utf8(out).unwrap()
    }

    const HEADER: &str = "ADDRESS  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f\n";

    #[test]
    fn test_hex_empty() {
        assert_eq!(hex(&[]), format!("{}0x0000: \n", HEADER));
    }

    #[test]
    fn test_hex_partial_row() {
        assert_eq!(hex(&[0x01, 0xff, 0x00]), format!("{}0x0000:  01 ff 00\n", HEADER));
    }

    #[test]
    fn test_hex_full_row_is_followed_by_empty_row() {
        let bytes: Vec<u8> = (0..16).collect();
        let out = hex(&bytes);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "0x0000:  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f"
        );
        assert_eq!(lines[2], "0x0010: ");
    }

    #[test]
    fn test_mnemonic_listing() {
        let mut bytecode = vec![Opcode::Push.byte()];
        bytecode.extend_from_slice(&int_bytes(-3));
        bytecode.push(Opcode::JumpIfNeg.byte());
        bytecode.extend_from_slice(&addr_bytes(0));
        bytecode.push(Opcode::Halt.byte());

        let prog = Program::from_bytecode(bytecode);
        assert_eq!(
            mnemonic(&prog),
            "0000: STACK_PUSH -3\n0005: FLOW_BLTZ 0\n0010: FLOW_HALT\n"
        );
    }

    #[test]
    fn test_mnemonic_unknown_byte_and_truncation() {
        let prog = Program::from_bytecode(vec![0xee, Opcode::Add.byte(), Opcode::Push.byte(), 1]);
        assert_eq!(
            mnemonic(&prog),
            "0000: UNDEFINED_INSTRUCTION [0xee]\n0001: ARITH_ADD\n0002: TRUNCATED STACK_PUSH\n"
        );
    }

    #[test]
    fn test_mnemonic_prints_labels() {
        let mut labels = BTreeMap::new();
        labels.insert("S".to_string(), 0);
        labels.insert("ST".to_string(), 1);
        labels.insert("T".to_string(), 2);
        let prog = Program {
            bytecode: vec![Opcode::Discard.byte(), Opcode::Return.byte()],
            labels,
            diagnostics: Vec::new(),
        };
        assert_eq!(
            mnemonic(&prog),
            "S:\n0000: STACK_POP\nST:\n0001: FLOW_ENDSUB\nT:\n"
        );
    }
}
