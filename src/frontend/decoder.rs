use crate::bytecode::op::WsInt;
use crate::frontend::reader::{Token, TokenBuffer};

/// One source-level instruction. Flow instructions still carry label
/// names; the compiler turns them into addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    // stack
    Push(WsInt),
    DupN(WsInt),
    Dup,
    Slide(WsInt),
    Swap,
    Discard,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // heap
    Store,
    Load,

    // flow
    Mark(String),
    Call(String),
    Jump(String),
    JumpIfZero(String),
    JumpIfNeg(String),
    Return,
    Halt,

    // I/O
    PutChar,
    PutNum,
    ReadChar,
    ReadNum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub instr: Instr,
    /// Token index where the instruction starts.
    pub position: usize,
}

/// Soft decode failures. Neither stops compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Token combination with no meaning inside its family. The prefix
    /// tokens are consumed and decoding resumes right after them.
    UnknownCommand {
        position: usize,
        family: &'static str,
        pattern: &'static str,
    },
    /// Input ended inside an instruction or operand.
    UnexpectedEnd { position: usize },
}

impl DecodeError {
    pub fn position(&self) -> usize {
        match self {
            DecodeError::UnknownCommand { position, .. } => *position,
            DecodeError::UnexpectedEnd { position } => *position,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnknownCommand {
                position,
                family,
                pattern,
            } => write!(
                f,
                "token {}: undefined {} command: {}",
                position, family, pattern
            ),
            DecodeError::UnexpectedEnd { position } => write!(
                f,
                "token {}: input ends in the middle of an instruction",
                position
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Cursor over a token buffer yielding one instruction at a time.
pub struct Decoder<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a TokenBuffer) -> Self {
        Self {
            tokens: buf.tokens(),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn expect(&mut self, start: usize) -> Result<Token, DecodeError> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEnd { position: start })?;
        self.pos += 1;
        Ok(token)
    }

    fn decode_at(&mut self, start: usize) -> Result<Instr, DecodeError> {
        use Token::*;
        match self.expect(start)? {
            Space => self.stack(start),
            Tab => match self.expect(start)? {
                Space => self.arith(start),
                Tab => self.heap(start),
                LineFeed => self.io(start),
            },
            LineFeed => self.flow(start),
        }
    }

    fn stack(&mut self, start: usize) -> Result<Instr, DecodeError> {
        use Token::*;
        Ok(match self.expect(start)? {
            Space => Instr::Push(self.number(start)?),
            Tab => match self.expect(start)? {
                Space => Instr::DupN(self.number(start)?),
                Tab => return Err(unknown(start, "stack", "[S][TT]")),
                LineFeed => Instr::Slide(self.number(start)?),
            },
            LineFeed => match self.expect(start)? {
                Space => Instr::Dup,
                Tab => Instr::Swap,
                LineFeed => Instr::Discard,
            },
        })
    }

    fn arith(&mut self, start: usize) -> Result<Instr, DecodeError> {
        use Token::*;
        Ok(match self.expect(start)? {
            Space => match self.expect(start)? {
                Space => Instr::Add,
                Tab => Instr::Sub,
                LineFeed => Instr::Mul,
            },
            Tab => match self.expect(start)? {
                Space => Instr::Div,
                Tab => Instr::Mod,
                LineFeed => return Err(unknown(start, "arithmetic", "[TS][TL]")),
            },
            LineFeed => return Err(unknown(start, "arithmetic", "[TS][L]")),
        })
    }

    fn heap(&mut self, start: usize) -> Result<Instr, DecodeError> {
        match self.expect(start)? {
            Token::Space => Ok(Instr::Store),
            Token::Tab => Ok(Instr::Load),
            Token::LineFeed => Err(unknown(start, "heap access", "[TT][L]")),
        }
    }

    fn io(&mut self, start: usize) -> Result<Instr, DecodeError> {
        use Token::*;
        Ok(match self.expect(start)? {
            Space => match self.expect(start)? {
                Space => Instr::PutChar,
                Tab => Instr::PutNum,
                LineFeed => return Err(unknown(start, "I/O", "[TL][SL]")),
            },
            Tab => match self.expect(start)? {
                Space => Instr::ReadChar,
                Tab => Instr::ReadNum,
                LineFeed => return Err(unknown(start, "I/O", "[TL][TL]")),
            },
            LineFeed => return Err(unknown(start, "I/O", "[TL][L]")),
        })
    }

    fn flow(&mut self, start: usize) -> Result<Instr, DecodeError> {
        use Token::*;
        Ok(match self.expect(start)? {
            Space => match self.expect(start)? {
                Space => Instr::Mark(self.label(start)?),
                Tab => Instr::Call(self.label(start)?),
                LineFeed => Instr::Jump(self.label(start)?),
            },
            Tab => match self.expect(start)? {
                Space => Instr::JumpIfZero(self.label(start)?),
                Tab => Instr::JumpIfNeg(self.label(start)?),
                LineFeed => Instr::Return,
            },
            LineFeed => match self.expect(start)? {
                LineFeed => Instr::Halt,
                Space => return Err(unknown(start, "flow control", "[L][LS]")),
                Tab => return Err(unknown(start, "flow control", "[L][LT]")),
            },
        })
    }

    /// Sign token, then binary digits up to a line feed. A bare line feed
    /// in the sign position is zero.
    fn number(&mut self, start: usize) -> Result<WsInt, DecodeError> {
        let negative = match self.expect(start)? {
            Token::Space => false,
            Token::Tab => true,
            Token::LineFeed => return Ok(0),
        };
        let mut sum: WsInt = 0;
        loop {
            match self.expect(start)? {
                Token::Space => sum = sum.wrapping_shl(1),
                Token::Tab => sum = sum.wrapping_shl(1).wrapping_add(1),
                Token::LineFeed => break,
            }
        }
        Ok(if negative { sum.wrapping_neg() } else { sum })
    }

    fn label(&mut self, start: usize) -> Result<String, DecodeError> {
        let mut name = String::new();
        loop {
            match self.expect(start)? {
                Token::LineFeed => return Ok(name),
                t => name.push(t.letter()),
            }
        }
    }
}

fn unknown(position: usize, family: &'static str, pattern: &'static str) -> DecodeError {
    DecodeError::UnknownCommand {
        position,
        family,
        pattern,
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Decoded, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.tokens.len() {
            return None;
        }
        let start = self.pos;
        Some(
            self.decode_at(start)
                .map(|instr| Decoded {
                    instr,
                    position: start,
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::testing::{encode_number, ws};
    use proptest::prelude::*;

    fn decode_all(letters: &str) -> Vec<Result<Instr, DecodeError>> {
        let buf = ws(letters);
        Decoder::new(&buf).map(|r| r.map(|d| d.instr)).collect()
    }

    fn decode_ok(letters: &str) -> Vec<Instr> {
        decode_all(letters)
            .into_iter()
            .map(|r| r.expect("decode should succeed"))
            .collect()
    }

    #[test]
    fn test_push_positive() {
        // S S | S (+) T S T L = 5
        assert_eq!(decode_ok("SS STSTL"), vec![Instr::Push(5)]);
    }

    #[test]
    fn test_push_negative() {
        assert_eq!(decode_ok("SS TTTL"), vec![Instr::Push(-3)]);
    }

    #[test]
    fn test_zero_from_bare_terminator() {
        // the line feed in sign position ends the number; next instr follows
        assert_eq!(decode_ok("SS L SLL"), vec![Instr::Push(0), Instr::Discard]);
    }

    #[test]
    fn test_sign_without_digits_is_zero() {
        assert_eq!(decode_ok("SS SL"), vec![Instr::Push(0)]);
        assert_eq!(decode_ok("SS TL"), vec![Instr::Push(0)]);
    }

    #[test]
    fn test_stack_family() {
        assert_eq!(
            decode_ok("STS STL STL STTL SLS SLT SLL"),
            vec![
                Instr::DupN(1),
                Instr::Slide(3),
                Instr::Dup,
                Instr::Swap,
                Instr::Discard
            ]
        );
    }

    #[test]
    fn test_arith_heap_io_families() {
        assert_eq!(
            decode_ok("TSSS TSST TSSL TSTS TSTT TTS TTT TLSS TLST TLTS TLTT"),
            vec![
                Instr::Add,
                Instr::Sub,
                Instr::Mul,
                Instr::Div,
                Instr::Mod,
                Instr::Store,
                Instr::Load,
                Instr::PutChar,
                Instr::PutNum,
                Instr::ReadChar,
                Instr::ReadNum,
            ]
        );
    }

    #[test]
    fn test_flow_family_and_labels() {
        assert_eq!(
            decode_ok("LSS STL LST TL LSL L LTS SL LTT TTL LTL LLL"),
            vec![
                Instr::Mark("ST".to_string()),
                Instr::Call("T".to_string()),
                Instr::Jump(String::new()),
                Instr::JumpIfZero("S".to_string()),
                Instr::JumpIfNeg("TT".to_string()),
                Instr::Return,
                Instr::Halt,
            ]
        );
    }

    #[test]
    fn test_same_tokens_give_same_label() {
        let instrs = decode_ok("LSS TSL LSL TSL");
        assert_eq!(
            instrs,
            vec![Instr::Mark("TS".to_string()), Instr::Jump("TS".to_string())]
        );
    }

    #[test]
    fn test_unknown_command_is_soft_and_skips_prefix() {
        let results = decode_all("STT SLL");
        assert_eq!(results.len(), 2);
        match &results[0] {
            Err(DecodeError::UnknownCommand {
                position, pattern, ..
            }) => {
                assert_eq!(*position, 0);
                assert_eq!(*pattern, "[S][TT]");
            }
            other => panic!("expected unknown command, got {:?}", other),
        }
        assert_eq!(results[1], Ok(Instr::Discard));
    }

    #[test]
    fn test_unknown_flow_command() {
        let results = decode_all("LLS");
        assert!(matches!(
            results[0],
            Err(DecodeError::UnknownCommand {
                pattern: "[L][LS]",
                ..
            })
        ));
    }

    #[test]
    fn test_unexpected_end_in_operand() {
        let results = decode_all("SLL SS STT");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok(Instr::Discard));
        assert_eq!(results[1], Err(DecodeError::UnexpectedEnd { position: 3 }));
    }

    #[test]
    fn test_positions_point_at_instruction_start() {
        let buf = ws("SLL TSSS");
        let positions: Vec<usize> = Decoder::new(&buf)
            .map(|r| r.unwrap().position)
            .collect();
        assert_eq!(positions, vec![0, 3]);
    }

    #[test]
    fn test_error_display() {
        let err = unknown(7, "heap access", "[TT][L]");
        let msg = err.to_string();
        assert!(msg.contains("token 7"));
        assert!(msg.contains("heap access"));
        assert!(msg.contains("[TT][L]"));
    }

    proptest! {
        #[test]
        fn prop_number_operand_round_trips(value in any::<i32>()) {
            let mut letters = String::from("SS");
            letters.push_str(&encode_number(value));
            let instrs = decode_ok(&letters);
            prop_assert_eq!(instrs, vec![Instr::Push(value)]);
        }
    }
}
