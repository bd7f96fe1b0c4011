use std::io::{self, Read};

/// Upper bound on significant tokens kept from one source.
pub const DEFAULT_MAX_SOURCE_SIZE: usize = 65536;

/// One of the three characters that carry meaning in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Space,
    Tab,
    LineFeed,
}

impl Token {
    pub fn from_byte(b: u8) -> Option<Token> {
        match b {
            b' ' => Some(Token::Space),
            b'\t' => Some(Token::Tab),
            b'\n' => Some(Token::LineFeed),
            _ => None,
        }
    }

    /// Letter used when tokens are shown to humans (`S`, `T`, `L`).
    pub fn letter(self) -> char {
        match self {
            Token::Space => 'S',
            Token::Tab => 'T',
            Token::LineFeed => 'L',
        }
    }
}

#[derive(Debug)]
pub enum ReadError {
    Io(io::Error),
    TooLarge { capacity: usize },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "read error: {}", e),
            ReadError::TooLarge { capacity } => write!(
                f,
                "read error: source exceeds the buffer capacity of {} tokens",
                capacity
            ),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            ReadError::TooLarge { .. } => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// Significant tokens of one source, in order. Built once, then read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
}

impl TokenBuffer {
    /// Reads all of `reader`, dropping every byte that is not a token.
    pub fn read<R: Read>(mut reader: R, capacity: usize) -> Result<Self, ReadError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        Self::from_bytes(&raw, capacity)
    }

    pub fn from_bytes(raw: &[u8], capacity: usize) -> Result<Self, ReadError> {
        let mut tokens = Vec::new();
        for token in raw.iter().filter_map(|&b| Token::from_byte(b)) {
            if tokens.len() == capacity {
                return Err(ReadError::TooLarge { capacity });
            }
            tokens.push(token);
        }
        log::debug!(
            "read {} tokens ({} bytes discarded)",
            tokens.len(),
            raw.len() - tokens.len()
        );
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<Token>> for TokenBuffer {
    fn from(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}
