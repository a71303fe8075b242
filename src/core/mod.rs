//! Core tokenizing primitives
//!
//! This module contains the fundamental building blocks for markup parsing:
//! - Chars: Unicode character-class predicates (XML 1.0 name classes)
//! - Entities: named and numeric character-reference decoding
//! - Name: qualified (QName) and resolved (DataName) markup names
//! - Scope: element scope stack with namespace bindings
//! - Stream: positional character sources (string and reader backed)
//! - Tokenizer: the permissive markup state machine

pub mod chars;
pub mod entities;
pub mod name;
pub mod scope;
pub mod stream;
pub mod tokenizer;
