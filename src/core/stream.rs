//! Positional character streams
//!
//! Forward-only decoded-character sources with one-character lookahead and
//! chunk capture:
//! - `StringStream`: zero-copy over an in-memory `&str`
//! - `ReaderStream`: incremental UTF-8 decoding over any `io::Read`, using
//!   a fill-and-compact byte buffer
//!
//! Both track `index`/`line`/`column` for diagnostics. Lines are counted
//! on `\n`; columns reset at each newline.

use std::io::Read;

use memchr::{memchr2, memchr_iter};

/// Sentinel returned by `peek` on a completed stream. Callers guard with
/// `is_completed` rather than comparing against this value.
pub const EOF_CHAR: char = '\0';

/// Buffer size for reading chunks.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// A forward-only stream of decoded characters.
///
/// `begin_chunk` marks the current position; `end_chunk` returns the text
/// between the mark and the current position and clears the mark.
pub trait TextStream {
    /// True when no characters remain.
    fn is_completed(&mut self) -> bool;

    /// The next character without advancing; [`EOF_CHAR`] when completed.
    fn peek(&mut self) -> char;

    /// Consume and return the next character, updating the position.
    fn pop(&mut self) -> char;

    /// Mark the current position as the start of a chunk.
    fn begin_chunk(&mut self);

    /// Return the text captured since `begin_chunk` and clear the mark.
    fn end_chunk(&mut self) -> String;

    /// 0-based character offset of the next character.
    fn index(&self) -> usize;

    /// 1-based line of the next character.
    fn line(&self) -> usize;

    /// 1-based column of the next character.
    fn column(&self) -> usize;

    /// Consume a run of plain character data, stopping before the next
    /// `<` or `&` marker or the end of input.
    fn skip_data_run(&mut self) {
        while !self.is_completed() {
            let ch = self.peek();
            if ch == '<' || ch == '&' {
                break;
            }
            self.pop();
        }
    }

    /// A latched lower-layer failure, if reading the source failed. The
    /// stream reports completed once a failure is latched.
    fn take_io_error(&mut self) -> Option<std::io::Error> {
        None
    }
}

/// Position tracking shared by both stream implementations.
#[derive(Debug, Clone, Copy)]
struct Position {
    index: usize,
    line: usize,
    column: usize,
}

impl Position {
    fn start() -> Self {
        Position {
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, ch: char) {
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

/// In-memory character stream. Chunks are slices of the input.
pub struct StringStream<'a> {
    input: &'a str,
    byte_pos: usize,
    chunk_start: Option<usize>,
    pos: Position,
}

impl<'a> StringStream<'a> {
    pub fn new(input: &'a str) -> Self {
        StringStream {
            input,
            byte_pos: 0,
            chunk_start: None,
            pos: Position::start(),
        }
    }
}

impl TextStream for StringStream<'_> {
    fn is_completed(&mut self) -> bool {
        self.byte_pos >= self.input.len()
    }

    fn peek(&mut self) -> char {
        self.input[self.byte_pos..].chars().next().unwrap_or(EOF_CHAR)
    }

    fn pop(&mut self) -> char {
        match self.input[self.byte_pos..].chars().next() {
            Some(ch) => {
                self.byte_pos += ch.len_utf8();
                self.pos.advance(ch);
                ch
            }
            None => EOF_CHAR,
        }
    }

    fn begin_chunk(&mut self) {
        self.chunk_start = Some(self.byte_pos);
    }

    fn end_chunk(&mut self) -> String {
        let start = self.chunk_start.take().unwrap_or(self.byte_pos);
        self.input[start..self.byte_pos].to_string()
    }

    fn index(&self) -> usize {
        self.pos.index
    }

    fn line(&self) -> usize {
        self.pos.line
    }

    fn column(&self) -> usize {
        self.pos.column
    }

    // Jump straight to the next marker byte; both markers are ASCII, so
    // the landing point is always a character boundary.
    fn skip_data_run(&mut self) {
        let rest = &self.input.as_bytes()[self.byte_pos..];
        let stop = memchr2(b'<', b'&', rest).unwrap_or(rest.len());
        if stop == 0 {
            return;
        }
        let skipped = &self.input[self.byte_pos..self.byte_pos + stop];
        self.byte_pos += stop;
        self.pos.index += skipped.chars().count();
        let newlines = memchr_iter(b'\n', skipped.as_bytes()).count();
        if newlines > 0 {
            self.pos.line += newlines;
            let after_last = skipped.rfind('\n').unwrap() + 1;
            self.pos.column = skipped[after_last..].chars().count() + 1;
        } else {
            self.pos.column += skipped.chars().count();
        }
    }
}

/// Buffered character stream over any reader.
///
/// Bytes are pulled through an internal buffer and decoded as UTF-8 one
/// character at a time; invalid or truncated sequences decode to U+FFFD.
/// Read failures are latched and surfaced through `take_io_error`.
pub struct ReaderStream<R: Read> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    pending: Option<char>,
    chunk: Option<String>,
    error: Option<std::io::Error>,
    pos: Position,
}

impl<R: Read> ReaderStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a stream with the given buffer capacity (at least four
    /// bytes, so a full UTF-8 sequence always fits).
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        ReaderStream {
            reader,
            buf: vec![0u8; capacity.max(4)],
            start: 0,
            end: 0,
            eof: false,
            pending: None,
            chunk: None,
            error: None,
            pos: Position::start(),
        }
    }

    /// Compact the buffer and pull more bytes from the reader.
    fn fill(&mut self) -> bool {
        if self.eof {
            return false;
        }
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        match self.reader.read(&mut self.buf[self.end..]) {
            Ok(0) => {
                self.eof = true;
                false
            }
            Ok(read) => {
                self.end += read;
                true
            }
            Err(err) => {
                self.error = Some(err);
                self.eof = true;
                false
            }
        }
    }

    /// Decode the next character into `pending` if one is available.
    fn ensure_pending(&mut self) {
        while self.pending.is_none() {
            if self.start >= self.end {
                if !self.fill() {
                    return;
                }
                continue;
            }
            let width = match self.buf[self.start] {
                0x00..=0x7F => 1,
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF7 => 4,
                _ => {
                    // stray continuation or invalid lead byte
                    self.start += 1;
                    self.pending = Some(char::REPLACEMENT_CHARACTER);
                    return;
                }
            };
            if self.start + width > self.end {
                if self.fill() {
                    continue;
                }
                // truncated sequence at end of input
                self.start = self.end;
                self.pending = Some(char::REPLACEMENT_CHARACTER);
                return;
            }
            match std::str::from_utf8(&self.buf[self.start..self.start + width]) {
                Ok(s) => {
                    self.pending = s.chars().next();
                    self.start += width;
                }
                Err(_) => {
                    self.start += 1;
                    self.pending = Some(char::REPLACEMENT_CHARACTER);
                }
            }
            return;
        }
    }
}

impl<R: Read> TextStream for ReaderStream<R> {
    fn is_completed(&mut self) -> bool {
        self.ensure_pending();
        self.pending.is_none()
    }

    fn peek(&mut self) -> char {
        self.ensure_pending();
        self.pending.unwrap_or(EOF_CHAR)
    }

    fn pop(&mut self) -> char {
        self.ensure_pending();
        match self.pending.take() {
            Some(ch) => {
                self.pos.advance(ch);
                if let Some(chunk) = &mut self.chunk {
                    chunk.push(ch);
                }
                ch
            }
            None => EOF_CHAR,
        }
    }

    fn begin_chunk(&mut self) {
        self.chunk = Some(String::new());
    }

    fn end_chunk(&mut self) -> String {
        self.chunk.take().unwrap_or_default()
    }

    fn index(&self) -> usize {
        self.pos.index
    }

    fn line(&self) -> usize {
        self.pos.line
    }

    fn column(&self) -> usize {
        self.pos.column
    }

    fn take_io_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_string_stream_pop_and_positions() {
        let mut stream = StringStream::new("ab\ncd");
        assert_eq!(stream.peek(), 'a');
        assert_eq!(stream.pop(), 'a');
        assert_eq!(stream.pop(), 'b');
        assert_eq!((stream.line(), stream.column()), (1, 3));
        assert_eq!(stream.pop(), '\n');
        assert_eq!((stream.line(), stream.column()), (2, 1));
        assert_eq!(stream.pop(), 'c');
        assert_eq!(stream.index(), 4);
        assert!(!stream.is_completed());
        stream.pop();
        assert!(stream.is_completed());
        assert_eq!(stream.peek(), EOF_CHAR);
    }

    #[test]
    fn test_string_stream_chunks() {
        let mut stream = StringStream::new("hello<b>");
        stream.begin_chunk();
        for _ in 0..5 {
            stream.pop();
        }
        assert_eq!(stream.end_chunk(), "hello");
        assert_eq!(stream.peek(), '<');
    }

    #[test]
    fn test_string_stream_skip_data_run() {
        let mut stream = StringStream::new("one\ntwo<br>");
        stream.begin_chunk();
        stream.skip_data_run();
        assert_eq!(stream.peek(), '<');
        assert_eq!(stream.end_chunk(), "one\ntwo");
        assert_eq!((stream.line(), stream.column()), (2, 4));
        assert_eq!(stream.index(), 7);
    }

    #[test]
    fn test_string_stream_skip_data_run_multibyte() {
        let mut stream = StringStream::new("héllo—&x");
        stream.skip_data_run();
        assert_eq!(stream.peek(), '&');
        assert_eq!(stream.index(), 6);
        assert_eq!(stream.column(), 7);
    }

    #[test]
    fn test_reader_stream_matches_string_stream() {
        let input = "a<b>\ntext&amp;";
        let mut reader = ReaderStream::new(Cursor::new(input.as_bytes().to_vec()));
        let mut expected = StringStream::new(input);
        while !expected.is_completed() {
            assert!(!reader.is_completed());
            assert_eq!(reader.pop(), expected.pop());
        }
        assert!(reader.is_completed());
    }

    #[test]
    fn test_reader_stream_refills_small_buffer() {
        let input = "abcdefghij";
        let mut stream = ReaderStream::with_capacity(Cursor::new(input.as_bytes().to_vec()), 4);
        let mut out = String::new();
        while !stream.is_completed() {
            out.push(stream.pop());
        }
        assert_eq!(out, input);
    }

    #[test]
    fn test_reader_stream_multibyte_across_fill_boundary() {
        // four-byte buffer forces the emoji to straddle a refill
        let input = "ab\u{1F600}cd";
        let mut stream = ReaderStream::with_capacity(Cursor::new(input.as_bytes().to_vec()), 4);
        let mut out = String::new();
        while !stream.is_completed() {
            out.push(stream.pop());
        }
        assert_eq!(out, input);
    }

    #[test]
    fn test_reader_stream_invalid_utf8_is_replaced() {
        let bytes = vec![b'a', 0xFF, b'b'];
        let mut stream = ReaderStream::new(Cursor::new(bytes));
        assert_eq!(stream.pop(), 'a');
        assert_eq!(stream.pop(), char::REPLACEMENT_CHARACTER);
        assert_eq!(stream.pop(), 'b');
        assert!(stream.is_completed());
    }

    #[test]
    fn test_reader_stream_chunks() {
        let mut stream = ReaderStream::new(Cursor::new(b"hello<b>".to_vec()));
        stream.begin_chunk();
        for _ in 0..5 {
            stream.pop();
        }
        assert_eq!(stream.end_chunk(), "hello");
        assert_eq!(stream.peek(), '<');
    }

    #[test]
    fn test_reader_stream_latches_io_error() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            }
        }

        let mut stream = ReaderStream::new(FailingReader);
        assert!(stream.is_completed());
        assert!(stream.take_io_error().is_some());
    }
}
