//! One-pass lexer: raw source bytes → ordered token sequence.
//!
//! [`Scanner::scan_tokens`] walks the buffer left to right with one- and
//! two-byte lookahead and returns every token it could form plus every
//! lexical error it ran into.  An error never aborts the scan: an
//! unexpected character or an unterminated string is recorded and scanning
//! resumes, so a single run surfaces all lexical problems at once.  The
//! token list always ends with exactly one `EOF` token carrying the final
//! line number.
//!
//! Lexemes are zero-copy slices of the input buffer; keywords are resolved
//! through a compile-time perfect-hash table and `//` comments are skipped
//! in bulk with `memchr`.

use crate::error::LoxError;
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Single-pass scanner over a UTF-8 source buffer.  The lifetime `'a` ties
/// every emitted token's `lexeme` slice back to the original buffer.
pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize, // index of the first byte of the current lexeme
    curr: usize,  // index one past the last byte examined
    line: usize,  // 1-based line counter ('\n' increments)
    tokens: Vec<Token<'a>>,
    errors: Vec<LoxError>,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner over `src`, which must be valid UTF-8.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Consume the whole buffer and return the token sequence alongside any
    /// lexical errors.  The token list is terminated by a single `EOF`.
    pub fn scan_tokens(mut self) -> (Vec<Token<'a>>, Vec<LoxError>) {
        while !self.is_at_end() {
            self.start = self.curr;
            self.scan_token();
        }

        self.tokens.push(Token::new(TokenType::EOF, "", self.line));

        debug!(
            "Scan finished: {} token(s), {} error(s)",
            self.tokens.len(),
            self.errors.len()
        );

        (self.tokens, self.errors)
    }

    // ───────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF
    /// to avoid branching at the call site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.src.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte iff it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// The current lexeme as a `&str` slice of the source.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        let slice: &[u8] = &self.src[self.start..self.curr];

        // SAFETY: the buffer is valid UTF-8 (guaranteed by the caller) and
        // lexeme boundaries fall on ASCII delimiters, so the slice is too.
        unsafe { std::str::from_utf8_unchecked(slice) }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        let token = Token::new(token_type, self.lexeme(), self.line);

        debug!("Scanned token ({:?}) on line {}", token.token_type, token.line);

        self.tokens.push(token);
    }

    // ───────────────────────────── core lexing ──────────────────────────

    /// Scan a single lexeme starting at `self.start`.  Whitespace and
    /// comments produce no token; unrecognised bytes record an error and
    /// scanning continues with the next byte.
    fn scan_token(&mut self) {
        let b = self.advance();

        match b {
            // single-character punctuators
            b'(' => self.add_token(TokenType::LEFT_PAREN),
            b')' => self.add_token(TokenType::RIGHT_PAREN),
            b'{' => self.add_token(TokenType::LEFT_BRACE),
            b'}' => self.add_token(TokenType::RIGHT_BRACE),
            b',' => self.add_token(TokenType::COMMA),
            b'.' => self.add_token(TokenType::DOT),
            b'-' => self.add_token(TokenType::MINUS),
            b'+' => self.add_token(TokenType::PLUS),
            b';' => self.add_token(TokenType::SEMICOLON),
            b'*' => self.add_token(TokenType::STAR),

            // two-character operators (!=, ==, <=, >=)
            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.add_token(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.add_token(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };

                self.add_token(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.add_token(tt);
            }

            // insignificant whitespace
            b' ' | b'\r' | b'\t' => {}

            b'\n' => {
                self.line += 1; // tracked for diagnostics
            }

            // comments (// … until newline) or division
            b'/' => {
                if self.match_byte(b'/') {
                    // bulk-skip to the next newline; the newline itself is
                    // left for the next scan_token call to count
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.src.len();
                    }
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            b'"' => self.scan_string(),

            b'0'..=b'9' => self.scan_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            _ => {
                self.errors.push(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        }
    }

    /// Scan a double-quoted string literal.  Strings may span lines; no
    /// escape sequences are processed.  An unterminated string is recorded
    /// as an error and the scan resumes at end of input.
    fn scan_string(&mut self) {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            self.errors
                .push(LoxError::lex(self.line, "Unterminated string."));
            return;
        }

        self.advance(); // closing quote

        // Slice excluding the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];

        // SAFETY: same argument as `lexeme` — valid UTF-8 split at quotes.
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };

        self.add_token(TokenType::STRING(s.to_owned()));
    }

    /// Scan a numeric literal (`123`, `3.14`).  Fractions are optional and
    /// require a digit after the dot, so `1.` lexes as `1` then `.`.
    fn scan_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0); // digits checked above
        self.add_token(TokenType::NUMBER(n));
    }

    /// Scan an identifier with maximal munch and decide whether it is a
    /// keyword or a generic `IDENTIFIER`.
    fn scan_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let tt: TokenType = KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.add_token(tt);
    }
}
