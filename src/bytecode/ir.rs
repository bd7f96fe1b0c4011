use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bytecode::compile_error::{CompileError, Diagnostic};
use crate::bytecode::op::WsAddr;

/// A compiled program: flat bytecode plus what the compiler learned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// `{opcode, operand?}` records. Its length bounds execution.
    pub bytecode: Vec<u8>,

    /// Resolved label name -> bytecode offset.
    pub labels: BTreeMap<String, WsAddr>,

    /// Soft errors found while compiling, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Program {
    pub fn from_bytecode(bytecode: Vec<u8>) -> Self {
        Self {
            bytecode,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Fails if any branch or call target was left undefined.
    pub fn ensure_linked(&self) -> Result<(), CompileError> {
        let undefined: Vec<String> = self
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UndefinedLabel { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect();
        if undefined.is_empty() {
            Ok(())
        } else {
            Err(CompileError::UndefinedLabels(undefined))
        }
    }

    /// Label names grouped by the offset they resolve to.
    pub fn labels_by_address(&self) -> BTreeMap<WsAddr, Vec<&str>> {
        let mut by_addr: BTreeMap<WsAddr, Vec<&str>> = BTreeMap::new();
        for (name, addr) in &self.labels {
            by_addr.entry(*addr).or_default().push(name);
        }
        by_addr
    }

    pub fn to_image(&self) -> Result<Vec<u8>, ImageError> {
        let image = Image {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
            bytecode: self.bytecode.clone(),
            labels: self.labels.clone(),
        };
        postcard::to_allocvec(&image).map_err(ImageError::Encode)
    }

    /// Loads an image written by [`Program::to_image`]. Diagnostics are
    /// not stored, so the result has none.
    pub fn from_image(bytes: &[u8]) -> Result<Program, ImageError> {
        let image: Image = postcard::from_bytes(bytes).map_err(ImageError::Decode)?;
        if image.magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic);
        }
        if image.version != IMAGE_VERSION {
            return Err(ImageError::UnsupportedVersion(image.version));
        }
        Ok(Program {
            bytecode: image.bytecode,
            labels: image.labels,
            diagnostics: Vec::new(),
        })
    }
}

// =============================================================================
// IMAGE - serialized program
// =============================================================================

const IMAGE_MAGIC: [u8; 4] = *b"WSBC";
const IMAGE_VERSION: u16 = 1;

/// On-disk form of a program. Operands keep host byte order, so an image
/// only runs on hosts with the same endianness.
#[derive(Debug, Serialize, Deserialize)]
struct Image {
    magic: [u8; 4],
    version: u16,
    bytecode: Vec<u8>,
    labels: BTreeMap<String, WsAddr>,
}

#[derive(Debug)]
pub enum ImageError {
    Encode(postcard::Error),
    Decode(postcard::Error),
    BadMagic,
    UnsupportedVersion(u16),
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageError::Encode(e) => write!(f, "image error: cannot encode: {}", e),
            ImageError::Decode(e) => write!(f, "image error: cannot decode: {}", e),
            ImageError::BadMagic => write!(f, "image error: not a bytecode image"),
            ImageError::UnsupportedVersion(v) => write!(
                f,
                "image error: unsupported version {} (expected {})",
                v, IMAGE_VERSION
            ),
        }
    }
}

impl std::error::Error for ImageError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::Opcode;

    fn sample() -> Program {
        let mut labels = BTreeMap::new();
        labels.insert("S".to_string(), 0);
        labels.insert("T".to_string(), 0);
        labels.insert("ST".to_string(), 5);
        Program {
            bytecode: vec![Opcode::Dup.byte(), Opcode::Discard.byte(), 0],
            labels,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_image_round_trip() {
        let prog = sample();
        let bytes = prog.to_image().unwrap();
        assert_eq!(Program::from_image(&bytes).unwrap(), prog);
    }

    #[test]
    fn test_image_rejects_garbage() {
        assert!(matches!(
            Program::from_image(&[1, 2, 3]),
            Err(ImageError::Decode(_)) | Err(ImageError::BadMagic)
        ));
    }

    #[test]
    fn test_image_rejects_other_version() {
        let image = Image {
            magic: IMAGE_MAGIC,
            version: 99,
            bytecode: vec![],
            labels: BTreeMap::new(),
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        assert!(matches!(
            Program::from_image(&bytes),
            Err(ImageError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_image_rejects_bad_magic() {
        let image = Image {
            magic: *b"NOPE",
            version: IMAGE_VERSION,
            bytecode: vec![],
            labels: BTreeMap::new(),
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        assert!(matches!(
            Program::from_image(&bytes),
            Err(ImageError::BadMagic)
        ));
    }

    #[test]
    fn test_ensure_linked() {
        let mut prog = sample();
        assert!(prog.ensure_linked().is_ok());
        prog.diagnostics.push(Diagnostic::UndefinedLabel {
            label: "TT".to_string(),
            sites: vec![1],
        });
        assert!(prog.has_errors());
        assert_eq!(
            prog.ensure_linked(),
            Err(CompileError::UndefinedLabels(vec!["TT".to_string()]))
        );
    }

    #[test]
    fn test_labels_by_address() {
        let prog = sample();
        let by_addr = prog.labels_by_address();
        assert_eq!(by_addr[&0], vec!["S", "T"]);
        assert_eq!(by_addr[&5], vec!["ST"]);
    }
}
