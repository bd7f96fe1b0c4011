pub mod decoder;
pub mod reader;
pub mod token_dumper;

pub use decoder::{DecodeError, Decoded, Decoder, Instr};
pub use reader::{ReadError, Token, TokenBuffer};
