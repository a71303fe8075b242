//! Character-class predicates
//!
//! XML 1.0 name classes plus the generic classes the tokenizer needs.
//! Name characters are restricted to the Basic Multilingual Plane; the
//! scanner treats anything past U+FFFD as ordinary text.

/// Unicode whitespace.
#[inline]
pub fn is_whitespace(ch: char) -> bool {
    ch.is_whitespace()
}

/// ASCII hexadecimal digit.
#[inline]
pub fn is_hex_digit(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

/// Unicode letter.
#[inline]
pub fn is_letter(ch: char) -> bool {
    ch.is_alphabetic()
}

/// XML 1.0 NameStartChar.
#[inline]
pub fn is_name_start_char(ch: char) -> bool {
    matches!(ch,
        ':'
        | '_'
        | 'A'..='Z'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}')
}

/// XML 1.0 NameChar: NameStartChar plus digits, `-`, `.`, and the
/// combining/extender ranges.
#[inline]
pub fn is_name_char(ch: char) -> bool {
    is_name_start_char(ch)
        || matches!(ch,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}
