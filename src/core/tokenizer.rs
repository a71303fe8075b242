//! Markup tokenizer - permissive state machine for tag extraction
//!
//! Single-pass scan over a character stream, emitting a flat token list:
//! - element begin/end/void tags with namespace-resolved names
//! - attributes with primitive (or unparsed) values
//! - coalesced character data with entity decoding
//! - opaque unparsed regions: comments, CDATA, SGML declarations,
//!   processing instructions, ASP/JSP/PHP `<% %>` and T4 `<# #>` blocks
//!
//! Recovery is HTML-style: input that merely violates strict XML is never
//! rejected. Stray markers fall back to literal text, mismatched end tags
//! are tolerated, and open elements can be auto-balanced at end of input.

use std::collections::HashSet;
use std::io::Read;

use log::{debug, trace};

use crate::core::chars;
use crate::core::entities;
use crate::core::name::{DataName, QName};
use crate::core::scope::{Scope, ScopeChain};
use crate::core::stream::{ReaderStream, StringStream, TextStream};
use crate::error::{DeserializationError, Result};
use crate::token::{coalesce_text, Token, UnparsedBlock};

/// Tokenizer options, with an impl for `Default`.
#[derive(Debug, Clone, Default)]
pub struct TokenizerOpts {
    /// Close still-open elements at end of input and tolerate mismatched
    /// end tags by unwinding to the matching open element.
    pub auto_balance_tags: bool,
    /// Inside a raw-text element, replace `<!--...-->` blocks with plain
    /// text holding the comment body.
    pub unwrap_unparsed_comments: bool,
    /// Element names whose content is raw text until the matching end tag
    /// (e.g. `script`, `style`).
    pub unparsed_tags: HashSet<QName>,
}

/// Tag classification while a tag is being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Begin,
    End,
    Void,
}

/// Result of recognizing a `<! <? <% <#` region.
enum UnparsedValue {
    /// An opaque block, kept verbatim with its markers.
    Block(UnparsedBlock),
    /// CDATA content, surfaced as plain character data.
    CharData(String),
}

impl UnparsedValue {
    fn into_token(self) -> Token {
        match self {
            UnparsedValue::Block(block) => Token::Unparsed(block),
            UnparsedValue::CharData(text) => Token::Primitive(text),
        }
    }
}

/// The tokenizer. One instance owns the scope chain and raw-text state for
/// a parse; instances may be reused serially.
pub struct Tokenizer {
    opts: TokenizerOpts,
    scopes: ScopeChain,
    unparse_block: Option<QName>,
}

impl Tokenizer {
    pub fn new(opts: TokenizerOpts) -> Self {
        Tokenizer {
            opts,
            scopes: ScopeChain::new(),
            unparse_block: None,
        }
    }

    pub fn options(&self) -> &TokenizerOpts {
        &self.opts
    }

    /// Tokenize the stream into the caller's sink.
    ///
    /// Instance state is reset on entry, so a tokenizer may be reused for
    /// independent parses.
    pub fn tokenize(
        &mut self,
        stream: &mut dyn TextStream,
        tokens: &mut Vec<Token>,
    ) -> Result<()> {
        self.scopes.clear();
        self.unparse_block = None;
        let result = self.scan_document(stream, tokens);
        if let Some(err) = stream.take_io_error() {
            return Err(DeserializationError::wrap(
                err,
                stream.index(),
                stream.line(),
                stream.column(),
            ));
        }
        result
    }

    fn scan_document(
        &mut self,
        stream: &mut dyn TextStream,
        tokens: &mut Vec<Token>,
    ) -> Result<()> {
        stream.begin_chunk();
        while !stream.is_completed() {
            match stream.peek() {
                '<' => {
                    let text = stream.end_chunk();
                    coalesce_text(tokens, &text);
                    self.scan_tag(stream, tokens)?;
                    stream.begin_chunk();
                }
                '&' => {
                    let text = stream.end_chunk();
                    coalesce_text(tokens, &text);
                    let decoded = scan_entity(stream);
                    coalesce_text(tokens, &decoded);
                    stream.begin_chunk();
                }
                _ => stream.skip_data_run(),
            }
        }
        let text = stream.end_chunk();
        coalesce_text(tokens, &text);

        if self.opts.auto_balance_tags {
            while self.scopes.pop().is_some() {
                debug!("auto-balancing open element at end of input");
                tokens.push(Token::ElementEnd);
            }
        }
        Ok(())
    }

    /// Scan one `<`-introduced construct: a tag, an unparsed block, or a
    /// literal-text fallback.
    fn scan_tag(&mut self, stream: &mut dyn TextStream, tokens: &mut Vec<Token>) -> Result<()> {
        stream.pop(); // '<'
        if stream.is_completed() {
            debug!("literal '<' at end of input");
            coalesce_text(tokens, "<");
            return Ok(());
        }

        if let Some(value) = self.scan_unparsed_block(stream)? {
            self.emit_unparsed(value, tokens);
            return Ok(());
        }

        let mut kind = TagKind::Begin;
        if stream.peek() == '/' {
            stream.pop();
            kind = TagKind::End;
        }

        let name = match self.scan_qname(stream)? {
            Some(name) => name,
            None => {
                // not actually a tag
                debug!("literal '<' before non-name character");
                coalesce_text(tokens, if kind == TagKind::End { "</" } else { "<" });
                return Ok(());
            }
        };

        if let Some(block_name) = &self.unparse_block {
            if kind != TagKind::End || name != *block_name {
                // raw-text passthrough: anything but our own end tag
                let mut literal = String::from(if kind == TagKind::End { "</" } else { "<" });
                literal.push_str(&name.to_string());
                coalesce_text(tokens, &literal);
                return Ok(());
            }
        }

        let mut attrs: Vec<(QName, Token)> = Vec::new();
        while !self.is_tag_complete(stream, &mut kind)? {
            let attr_name = match self.scan_qname(stream)? {
                Some(attr_name) => attr_name,
                None => return Err(self.error("malformed attribute name", stream)),
            };
            let value = self.scan_attribute_value(stream)?;
            attrs.push((attr_name, value));
        }

        self.emit_tag(kind, &name, attrs, tokens, stream)?;

        self.unparse_block =
            if kind == TagKind::Begin && self.opts.unparsed_tags.contains(&name) {
                Some(name)
            } else {
                None
            };
        Ok(())
    }

    /// Scan a qualified name, or None when the stream is not at one.
    fn scan_qname(&self, stream: &mut dyn TextStream) -> Result<Option<QName>> {
        if stream.is_completed() || !chars::is_name_start_char(stream.peek()) {
            return Ok(None);
        }
        stream.begin_chunk();
        while !stream.is_completed() && chars::is_name_char(stream.peek()) {
            stream.pop();
        }
        let raw = stream.end_chunk();
        match QName::parse(&raw) {
            Some(name) => Ok(Some(name)),
            None => Err(self.error(format!("invalid name '{raw}'"), stream)),
        }
    }

    /// Skip whitespace, then decide whether the tag is closed. `/>`
    /// promotes a begin tag to a void tag.
    fn is_tag_complete(&self, stream: &mut dyn TextStream, kind: &mut TagKind) -> Result<bool> {
        skip_whitespace(stream);
        if stream.is_completed() {
            return Err(self.error("unexpected end of input inside tag", stream));
        }
        match stream.peek() {
            '>' => {
                stream.pop();
                Ok(true)
            }
            '/' => {
                stream.pop();
                if stream.is_completed() || stream.peek() != '>' {
                    return Err(self.error("malformed void tag", stream));
                }
                stream.pop();
                if *kind != TagKind::Begin {
                    return Err(self.error("malformed void tag", stream));
                }
                *kind = TagKind::Void;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Scan one attribute value. A missing `=` yields an empty value; a
    /// value may also be an unparsed code block.
    fn scan_attribute_value(&self, stream: &mut dyn TextStream) -> Result<Token> {
        skip_whitespace(stream);
        if stream.is_completed() || stream.peek() != '=' {
            // HTML-style empty attribute
            return Ok(Token::Primitive(String::new()));
        }
        stream.pop(); // '='
        skip_whitespace(stream);
        if stream.is_completed() {
            return Err(self.error("unexpected end of input inside attribute value", stream));
        }

        match stream.peek() {
            quote @ ('"' | '\'') => {
                stream.pop();
                if !stream.is_completed() && stream.peek() == '<' {
                    stream.pop();
                    if let Some(value) = self.scan_unparsed_block(stream)? {
                        // only the block counts; anything else before the
                        // closing quote is malformed
                        loop {
                            if stream.is_completed() {
                                return Err(
                                    self.error("missing attribute value delimiter", stream)
                                );
                            }
                            let ch = stream.peek();
                            if ch == quote {
                                stream.pop();
                                break;
                            }
                            if chars::is_whitespace(ch) {
                                return Err(self.error("malformed attribute value", stream));
                            }
                            stream.pop();
                        }
                        return Ok(value.into_token());
                    }
                    let rest = self.read_quoted_rest(stream, quote)?;
                    return Ok(Token::Primitive(format!("<{rest}")));
                }
                let value = self.read_quoted_rest(stream, quote)?;
                Ok(Token::Primitive(value))
            }
            '<' => {
                stream.pop();
                if let Some(value) = self.scan_unparsed_block(stream)? {
                    return Ok(value.into_token());
                }
                let rest = self.read_unquoted_rest(stream, false)?;
                Ok(Token::Primitive(format!("<{rest}")))
            }
            _ => {
                let value = self.read_unquoted_rest(stream, true)?;
                Ok(Token::Primitive(value))
            }
        }
    }

    /// Read up to (and consume) the closing quote.
    fn read_quoted_rest(&self, stream: &mut dyn TextStream, quote: char) -> Result<String> {
        stream.begin_chunk();
        loop {
            if stream.is_completed() {
                return Err(self.error("missing attribute value delimiter", stream));
            }
            if stream.peek() == quote {
                break;
            }
            stream.pop();
        }
        let value = stream.end_chunk();
        stream.pop(); // closing quote
        Ok(value)
    }

    /// Read an unquoted value run. The first character is consumed
    /// unconditionally when `consume_first` is set, so values like `/foo`
    /// survive; after that the run ends at whitespace, `/`, or `>`.
    fn read_unquoted_rest(
        &self,
        stream: &mut dyn TextStream,
        consume_first: bool,
    ) -> Result<String> {
        stream.begin_chunk();
        let mut first = consume_first;
        loop {
            if stream.is_completed() {
                return Err(
                    self.error("unexpected end of input inside attribute value", stream)
                );
            }
            let ch = stream.peek();
            if chars::is_whitespace(ch) || ch == '>' || (ch == '/' && !first) {
                break;
            }
            stream.pop();
            first = false;
        }
        Ok(stream.end_chunk())
    }

    /// Recognize a `<!`, `<?`, `<%`, or `<#` region. The leading `<` is
    /// already consumed; any other next character rewinds to ordinary tag
    /// scanning by returning None.
    fn scan_unparsed_block(
        &self,
        stream: &mut dyn TextStream,
    ) -> Result<Option<UnparsedValue>> {
        let value = match stream.peek() {
            '!' => {
                stream.pop();
                match stream.peek() {
                    '-' => UnparsedValue::Block(self.scan_block(stream, "--", "!--", "--")?),
                    '[' => {
                        let block = self.scan_block(stream, "[CDATA[", "![CDATA[", "]]")?;
                        UnparsedValue::CharData(block.value)
                    }
                    _ => UnparsedValue::Block(self.scan_block(stream, "", "!", "")?),
                }
            }
            '?' => {
                stream.pop();
                if !stream.is_completed() && stream.peek() == '=' {
                    stream.pop();
                    UnparsedValue::Block(self.scan_block(stream, "", "?=", "?>")?)
                } else {
                    UnparsedValue::Block(self.scan_block(stream, "", "?", "?>")?)
                }
            }
            '%' => {
                stream.pop();
                match stream.peek() {
                    '-' => UnparsedValue::Block(self.scan_block(stream, "--", "%--", "--%")?),
                    ch @ ('@' | '=' | '!' | '#' | '$' | ':') => {
                        stream.pop();
                        let begin = format!("%{ch}");
                        UnparsedValue::Block(self.scan_block(stream, "", &begin, "%>")?)
                    }
                    _ => UnparsedValue::Block(self.scan_block(stream, "", "%", "%>")?),
                }
            }
            '#' => {
                stream.pop();
                match stream.peek() {
                    '-' => UnparsedValue::Block(self.scan_block(stream, "--", "#--", "--#")?),
                    ch @ ('@' | '=' | '+') => {
                        stream.pop();
                        let begin = format!("#{ch}");
                        UnparsedValue::Block(self.scan_block(stream, "", &begin, "#>")?)
                    }
                    _ => UnparsedValue::Block(self.scan_block(stream, "", "#", "#>")?),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Consume the remainder of a begin marker, then the body up to the
    /// end marker and its final `>`.
    fn scan_block(
        &self,
        stream: &mut dyn TextStream,
        begin_rest: &str,
        begin: &str,
        end: &str,
    ) -> Result<UnparsedBlock> {
        for expected in begin_rest.chars() {
            if stream.is_completed() || stream.peek() != expected {
                return Err(self.error(
                    format!("malformed unparsed block, expected '<{begin}'"),
                    stream,
                ));
            }
            stream.pop();
        }
        let body = self.scan_block_body(stream, end)?;
        Ok(UnparsedBlock::new(begin, end, body))
    }

    /// Read until the end marker followed by `>`; the marker's own `>`
    /// (when it carries one) doubles as that terminator.
    fn scan_block_body(&self, stream: &mut dyn TextStream, end: &str) -> Result<String> {
        let marker = end.strip_suffix('>').unwrap_or(end);
        let mut body = String::new();
        loop {
            if stream.is_completed() {
                return Err(
                    self.error("unexpected end of input inside unparsed block", stream)
                );
            }
            if body.ends_with(marker) && stream.peek() == '>' {
                stream.pop();
                body.truncate(body.len() - marker.len());
                return Ok(body);
            }
            body.push(stream.pop());
        }
    }

    /// Emit a recognized unparsed region, honoring the comment-unwrapping
    /// option inside raw-text elements.
    fn emit_unparsed(&self, value: UnparsedValue, tokens: &mut Vec<Token>) {
        match value {
            UnparsedValue::CharData(text) => coalesce_text(tokens, &text),
            UnparsedValue::Block(block) => {
                if self.unparse_block.is_some()
                    && self.opts.unwrap_unparsed_comments
                    && block.begin == "!--"
                {
                    coalesce_text(tokens, &block.value);
                } else {
                    tokens.push(Token::Unparsed(block));
                }
            }
        }
    }

    /// Emit a completed tag, maintaining the scope chain.
    fn emit_tag(
        &mut self,
        kind: TagKind,
        name: &QName,
        mut attrs: Vec<(QName, Token)>,
        tokens: &mut Vec<Token>,
        stream: &dyn TextStream,
    ) -> Result<()> {
        if kind == TagKind::End {
            let close_name = DataName::new(
                &name.local,
                &name.prefix,
                self.scopes.resolve_namespace(&name.prefix),
            );
            match self.scopes.pop() {
                Some(scope) if scope.tag_name == close_name => {
                    trace!("end tag </{close_name}>");
                    tokens.push(Token::ElementEnd);
                    return Ok(());
                }
                Some(scope) => self.scopes.push(scope),
                None => {}
            }
            if !self.opts.auto_balance_tags {
                debug!("unbalanced end tag </{name}>");
                tokens.push(Token::ElementEnd);
                return Ok(());
            }
            if !self.scopes.contains_tag(&close_name) {
                debug!("dropping stray end tag </{name}>");
                return Ok(());
            }
            // unwind to the matching open element
            while let Some(scope) = self.scopes.pop() {
                tokens.push(Token::ElementEnd);
                if scope.tag_name == close_name {
                    break;
                }
            }
            return Ok(());
        }

        let mut scope = Scope::new();
        for i in (0..attrs.len()).rev() {
            let (attr_name, _) = &attrs[i];
            let declares_default = attr_name.prefix.is_empty() && attr_name.local == "xmlns";
            let declares_prefix = attr_name.prefix == "xmlns";
            if !declares_default && !declares_prefix {
                continue;
            }
            let (attr_name, value) = attrs.remove(i);
            let uri = match value {
                Token::Primitive(uri) => uri,
                _ => return Err(self.error("xmlns declaration without a value", stream)),
            };
            if declares_default {
                scope.bind("", uri);
            } else {
                scope.bind(attr_name.local, uri);
            }
        }
        self.scopes.push(scope);

        if name.has_prefix()
            && !self.scopes.contains_prefix(&name.prefix)
            && self.scopes.contains_prefix("")
        {
            // unknown prefix under a bound default namespace maps to ""
            if let Some(top) = self.scopes.top_mut() {
                top.bind(name.prefix.clone(), "");
            }
        }

        let tag_name = DataName::new(
            &name.local,
            &name.prefix,
            self.scopes.resolve_namespace(&name.prefix),
        );
        if let Some(top) = self.scopes.top_mut() {
            top.tag_name = tag_name.clone();
        }
        trace!("begin tag <{tag_name}> ({kind:?})");
        tokens.push(if kind == TagKind::Void {
            Token::ElementVoid(tag_name)
        } else {
            Token::ElementBegin(tag_name)
        });

        for (attr_name, value) in attrs {
            let resolved = DataName::new(
                &attr_name.local,
                &attr_name.prefix,
                self.scopes.resolve_namespace(&attr_name.prefix),
            );
            tokens.push(Token::Attribute(resolved));
            tokens.push(value);
        }

        if kind == TagKind::Void {
            self.scopes.pop();
        }
        Ok(())
    }

    fn error(
        &self,
        message: impl Into<String>,
        stream: &dyn TextStream,
    ) -> DeserializationError {
        DeserializationError::new(message, stream.index(), stream.line(), stream.column())
    }
}

/// Decode one `&...` reference. Never fails: anything unrecognized comes
/// back as the literal text that was consumed.
fn scan_entity(stream: &mut dyn TextStream) -> String {
    stream.pop(); // '&'
    if stream.is_completed() {
        return "&".into();
    }
    let ch = stream.peek();
    if chars::is_whitespace(ch) || ch == '&' || ch == '<' {
        return "&".into();
    }

    if ch == '#' {
        stream.pop();
        let mut hex = false;
        if !stream.is_completed() && matches!(stream.peek(), 'x' | 'X') {
            hex = true;
            stream.pop();
        }
        let mut digits = String::new();
        loop {
            if stream.is_completed() {
                break;
            }
            let d = stream.peek();
            let in_range = if hex {
                chars::is_hex_digit(d)
            } else {
                d.is_ascii_digit()
            };
            if !in_range {
                break;
            }
            digits.push(stream.pop());
        }
        let radix = if hex { 16 } else { 10 };
        if let Some(decoded) = u32::from_str_radix(&digits, radix)
            .ok()
            .and_then(entities::from_code_point)
        {
            if !stream.is_completed() && stream.peek() == ';' {
                stream.pop();
            }
            return decoded;
        }
        // unusable reference: emit what was consumed (an uppercase X folds
        // to x here)
        let mut literal = String::from("&#");
        if hex {
            literal.push('x');
        }
        literal.push_str(&digits);
        return literal;
    }

    let mut reference = String::new();
    while !stream.is_completed() && stream.peek().is_ascii_alphanumeric() {
        reference.push(stream.pop());
    }
    match entities::decode_named(&reference) {
        Some(decoded) => {
            if !stream.is_completed() && stream.peek() == ';' {
                stream.pop();
            }
            decoded.to_string()
        }
        None => format!("&{reference}"),
    }
}

fn skip_whitespace(stream: &mut dyn TextStream) {
    while !stream.is_completed() && chars::is_whitespace(stream.peek()) {
        stream.pop();
    }
}

/// Tokenize an in-memory string.
pub fn tokenize_str(input: &str, opts: TokenizerOpts) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(opts);
    let mut stream = StringStream::new(input);
    let mut tokens = Vec::new();
    tokenizer.tokenize(&mut stream, &mut tokens)?;
    Ok(tokens)
}

/// Tokenize from any reader. The reader is owned by the call and released
/// on return.
pub fn tokenize_reader<R: Read>(reader: R, opts: TokenizerOpts) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(opts);
    let mut stream = ReaderStream::new(reader);
    let mut tokens = Vec::new();
    tokenizer.tokenize(&mut stream, &mut tokens)?;
    Ok(tokens)
}
