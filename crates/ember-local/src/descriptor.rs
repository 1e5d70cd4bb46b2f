//! Method descriptor parsing
//!
//! Descriptors use the managed runtime's type grammar:
//!
//! ```text
//! MethodDescriptor := '(' FieldType* ')' ( FieldType | 'V' )
//! FieldType        := 'Z' | 'B' | 'C' | 'S' | 'I' | 'J' | 'F' | 'D'
//!                   | 'L' ClassName ';'
//!                   | '[' FieldType
//! ```

use ember_sdk::ArgValue;
use std::fmt;
use thiserror::Error;

/// Descriptor parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Descriptor does not start with `(`
    #[error("Descriptor '{descriptor}' has no parameter list")]
    MissingParameterList {
        /// The descriptor being parsed
        descriptor: String,
    },

    /// Input ended in the middle of a type
    #[error("Descriptor '{descriptor}' ends unexpectedly")]
    UnexpectedEnd {
        /// The descriptor being parsed
        descriptor: String,
    },

    /// Unknown type character
    #[error("Invalid type '{found}' at position {position} in descriptor '{descriptor}'")]
    InvalidType {
        /// The descriptor being parsed
        descriptor: String,
        /// Byte offset of the offending character
        position: usize,
        /// The offending character
        found: char,
    },

    /// `L` without a terminating `;`
    #[error("Unterminated class name in descriptor '{descriptor}'")]
    UnterminatedClassName {
        /// The descriptor being parsed
        descriptor: String,
    },

    /// `L;`
    #[error("Empty class name in descriptor '{descriptor}'")]
    EmptyClassName {
        /// The descriptor being parsed
        descriptor: String,
    },

    /// Characters left after the return type
    #[error("Trailing characters at position {position} in descriptor '{descriptor}'")]
    TrailingCharacters {
        /// The descriptor being parsed
        descriptor: String,
        /// Byte offset of the first extra character
        position: usize,
    },
}

/// A parameter or return type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `Lname;`
    Object(String),
    /// `[elem`
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parse a single field type, e.g. `[I` or `Ljava/lang/String;`
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut parser = Parser::new(descriptor);
        let ty = parser.field()?;
        parser.finish()?;
        Ok(ty)
    }

    /// Whether values of this type are object references
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// The name a heap object of this type reports: the class name for
    /// objects, the descriptor for arrays
    pub fn type_name(&self) -> String {
        match self {
            FieldType::Object(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// Whether `arg` has the right shape for this type.
    ///
    /// Reference types accept any object argument; what the object actually
    /// is can only be checked against the heap.
    pub fn accepts(&self, arg: &ArgValue) -> bool {
        match self {
            FieldType::Object(_) | FieldType::Array(_) => matches!(arg, ArgValue::Object(_)),
            FieldType::Boolean => matches!(arg, ArgValue::Bool(_)),
            FieldType::Byte => matches!(arg, ArgValue::Byte(_)),
            FieldType::Char => matches!(arg, ArgValue::Char(_)),
            FieldType::Short => matches!(arg, ArgValue::Short(_)),
            FieldType::Int => matches!(arg, ArgValue::Int(_)),
            FieldType::Long => matches!(arg, ArgValue::Long(_)),
            FieldType::Float => matches!(arg, ArgValue::Float(_)),
            FieldType::Double => matches!(arg, ArgValue::Double(_)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => f.write_str("Z"),
            FieldType::Byte => f.write_str("B"),
            FieldType::Char => f.write_str("C"),
            FieldType::Short => f.write_str("S"),
            FieldType::Int => f.write_str("I"),
            FieldType::Long => f.write_str("J"),
            FieldType::Float => f.write_str("F"),
            FieldType::Double => f.write_str("D"),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(elem) => write!(f, "[{}", elem),
        }
    }
}

/// A parsed method descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Parameter types in order
    pub params: Vec<FieldType>,
    /// Return type, `None` for `V`
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    /// Parse a method descriptor such as `(Ljava/lang/String;)V`
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut parser = Parser::new(descriptor);
        if parser.peek() != Some(b'(') {
            return Err(DescriptorError::MissingParameterList {
                descriptor: descriptor.to_string(),
            });
        }
        parser.pos += 1;

        let mut params = Vec::new();
        loop {
            match parser.peek() {
                Some(b')') => {
                    parser.pos += 1;
                    break;
                }
                Some(_) => params.push(parser.field()?),
                None => return Err(parser.unexpected_end()),
            }
        }

        let ret = if parser.peek() == Some(b'V') {
            parser.pos += 1;
            None
        } else {
            Some(parser.field()?)
        };
        parser.finish()?;

        Ok(Self { params, ret })
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether the method returns nothing
    pub fn returns_void(&self) -> bool {
        self.ret.is_none()
    }

    /// Check an argument vector's arity and primitive shapes.
    ///
    /// Returns a message describing the first mismatch.
    pub fn check_args(&self, args: &[ArgValue]) -> Result<(), String> {
        if args.len() != self.params.len() {
            return Err(format!(
                "wrong number of arguments: expected {}, got {}",
                self.params.len(),
                args.len()
            ));
        }
        for (index, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if !param.accepts(arg) {
                return Err(format!(
                    "argument {} has type {}, expected {}",
                    index,
                    arg.descriptor_char(),
                    param
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{}", ret),
            None => f.write_str("V"),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn unexpected_end(&self) -> DescriptorError {
        DescriptorError::UnexpectedEnd {
            descriptor: self.src.to_string(),
        }
    }

    fn field(&mut self) -> Result<FieldType, DescriptorError> {
        let position = self.pos;
        let byte = self.peek().ok_or_else(|| self.unexpected_end())?;
        self.pos += 1;

        let ty = match byte {
            b'Z' => FieldType::Boolean,
            b'B' => FieldType::Byte,
            b'C' => FieldType::Char,
            b'S' => FieldType::Short,
            b'I' => FieldType::Int,
            b'J' => FieldType::Long,
            b'F' => FieldType::Float,
            b'D' => FieldType::Double,
            b'[' => FieldType::Array(Box::new(self.field()?)),
            b'L' => {
                let rest = &self.src[self.pos..];
                let end = rest
                    .find(';')
                    .ok_or_else(|| DescriptorError::UnterminatedClassName {
                        descriptor: self.src.to_string(),
                    })?;
                if end == 0 {
                    return Err(DescriptorError::EmptyClassName {
                        descriptor: self.src.to_string(),
                    });
                }
                let name = rest[..end].to_string();
                self.pos += end + 1;
                FieldType::Object(name)
            }
            _ => {
                let found = self.src[position..].chars().next().unwrap_or('?');
                return Err(DescriptorError::InvalidType {
                    descriptor: self.src.to_string(),
                    position,
                    found,
                });
            }
        };
        Ok(ty)
    }

    fn finish(&self) -> Result<(), DescriptorError> {
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(DescriptorError::TrailingCharacters {
                descriptor: self.src.to_string(),
                position: self.pos,
            })
        }
    }
}
