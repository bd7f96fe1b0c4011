//! # blankspace
//!
//! A compiler and virtual machine for the Whitespace language. Only space,
//! tab and line-feed characters are significant; everything else in a
//! source file is a comment.
//!
//! The pipeline is:
//! ```text
//! bytes -> TokenBuffer -> Decoder -> Compiler -> Program -> Vm
//! ```
//! [`frontend`] turns raw input into tokens and instructions,
//! [`bytecode`] compiles them in a single pass into flat bytecode and can
//! render or serialize the result, and [`runtime`] executes it.
//!
//! ```
//! use blankspace::bytecode::Compiler;
//! use blankspace::frontend::TokenBuffer;
//! use blankspace::runtime::Vm;
//!
//! // push 1, output number, halt
//! let tokens = TokenBuffer::from_bytes(b"   \t\n\t\n \t\n\n\n", 1024).unwrap();
//! let prog = Compiler::new().compile(&tokens).unwrap();
//! let mut out = Vec::new();
//! Vm::new().run(&prog, &mut &b""[..], &mut out).unwrap();
//! assert_eq!(out, b"1");
//! ```

pub mod bytecode;
pub mod frontend;
pub mod runtime;
