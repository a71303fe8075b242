//! markscan - permissive streaming markup tokenizer
//!
//! Tokenizes HTML, XML, and embedded-code markup dialects (SGML
//! declarations, CDATA, processing instructions, ASP/JSP/PHP `<% %>`,
//! T4 `<# #>`) into a flat token sequence with HTML-style error recovery:
//! malformed input falls back to literal text instead of failing.
//!
//! ```
//! use markscan::{tokenize_str, Token, TokenizerOpts};
//!
//! let tokens = tokenize_str("<a href=/foo>x</a>", TokenizerOpts::default()).unwrap();
//! assert_eq!(tokens.len(), 5);
//! assert!(tokens[0].is_begin());
//! assert_eq!(tokens[3], Token::Primitive("x".into()));
//! ```

pub mod core;
pub mod error;
pub mod format;
pub mod token;

pub use crate::core::name::{DataName, QName};
pub use crate::core::scope::{Scope, ScopeChain};
pub use crate::core::stream::{ReaderStream, StringStream, TextStream};
pub use crate::core::tokenizer::{tokenize_reader, tokenize_str, Tokenizer, TokenizerOpts};
pub use crate::error::DeserializationError;
pub use crate::token::{Token, UnparsedBlock};
