use std::io::{self, Write};

use crate::frontend::reader::{Token, TokenBuffer};

/// Renders a token buffer as readable letters: space → `S`, tab → `T`,
/// line feeds are kept so the line structure survives.
#[derive(Default)]
pub struct TokenDumper {
    pub color: bool,
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const CYN: &'static str = "\x1b[36m";
    const YEL: &'static str = "\x1b[33m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(mut self) -> Self {
        self.color = true;
        self
    }

    pub fn visualize<W: Write>(&self, out: &mut W, tokens: &TokenBuffer) -> io::Result<()> {
        for &token in tokens.tokens() {
            match token {
                Token::LineFeed => writeln!(out)?,
                t if self.color => {
                    write!(out, "{}{}{}", self.color_of(t), t.letter(), Self::RESET)?
                }
                t => write!(out, "{}", t.letter())?,
            }
        }
        Ok(())
    }

    fn color_of(&self, t: Token) -> &'static str {
        match t {
            Token::Space => Self::CYN,
            Token::Tab => Self::YEL,
            Token::LineFeed => Self::RESET,
        }
    }
}

/// Inverse of the visualizer: `S` → space, `T` → tab, line feeds kept,
/// everything else dropped. Works on raw text, since the letters would be
/// discarded by the token reader.
pub fn encode_visible(text: &[u8]) -> Vec<u8> {
    text.iter()
        .filter_map(|&b| match b {
            b'S' => Some(b' '),
            b'T' => Some(b'\t'),
            b'\n' => Some(b'\n'),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::testing::ws;

    fn render(dumper: &TokenDumper, letters: &str) -> String {
        let mut out = Vec::new();
        dumper.visualize(&mut out, &ws(letters)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_visualize_plain() {
        assert_eq!(render(&TokenDumper::new(), "SSTL SLL"), "SST\nS\n\n");
    }

    #[test]
    fn test_visualize_color_wraps_letters() {
        let s = render(&TokenDumper::new().with_color(), "ST");
        assert!(s.contains("\x1b[36mS\x1b[0m"));
        assert!(s.contains("\x1b[33mT\x1b[0m"));
    }

    #[test]
    fn test_encode_visible_drops_other_bytes() {
        assert_eq!(encode_visible(b"push S T\nhello"), b" \t\n".to_vec());
    }

    #[test]
    fn test_encode_then_visualize_round_trip() {
        let text = "SST\nTSSS\n";
        let encoded = encode_visible(text.as_bytes());
        let buf = TokenBuffer::from_bytes(&encoded, 64).unwrap();
        let mut out = Vec::new();
        TokenDumper::new().visualize(&mut out, &buf).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }
}
