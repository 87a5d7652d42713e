use std::ops::Range;

use tracing::trace;

use crate::error::{GparseError, Span};
use crate::value::Kind;

/// Default upper bound on the number of tokens in one statement.
pub const DEFAULT_MAX_TOKENS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Brackets and separators
    LeftParen,
    RightParen,
    Comma,
    /// A verbatim `{ ... }` span, parsed later by the statement driver.
    Block,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PercentPercent,
    StarStar,
    PlusPlus,
    MinusMinus,

    // Unary only
    Bang,
    Tilde,

    // Comparison
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical (`&&`/`and`, `||`/`or`)
    And,
    Or,

    // Bitwise (`^` and `xor` are the same token)
    Ampersand,
    Pipe,
    Caret,
    ShiftLeft,
    ShiftRight,

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    AmpersandEqual,
    PipeEqual,
    CaretEqual,

    // Literals
    Identifier,
    Number,
    True,
    False,

    // Keywords
    TypeName(Kind),
    Void,
    Struct,
    Function,
}

impl TokenType {
    /// Names and literals.
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            TokenType::Identifier | TokenType::Number | TokenType::True | TokenType::False
        )
    }

    /// Tokens that can close an operand, so that a following `+`/`-` is
    /// binary rather than a sign.
    pub fn ends_operand(&self) -> bool {
        self.is_operand()
            || matches!(
                self,
                TokenType::RightParen | TokenType::PlusPlus | TokenType::MinusMinus
            )
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenType::Equal
                | TokenType::PlusEqual
                | TokenType::MinusEqual
                | TokenType::StarEqual
                | TokenType::SlashEqual
                | TokenType::AmpersandEqual
                | TokenType::PipeEqual
                | TokenType::CaretEqual
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub token_type: TokenType,
    pub lexeme: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(token_type: TokenType, lexeme: &'src str, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
        }
    }

    /// Source range between the braces of a block token.
    pub fn block_contents(&self) -> Range<usize> {
        (self.span.start + 1)..(self.span.end - 1)
    }
}

pub fn keyword(text: &str) -> Option<TokenType> {
    let token_type = match text {
        "bool" => TokenType::TypeName(Kind::Bool),
        "byte" => TokenType::TypeName(Kind::Byte),
        "int" => TokenType::TypeName(Kind::Int),
        "int64" => TokenType::TypeName(Kind::Int64),
        "float" => TokenType::TypeName(Kind::Float),
        "double" => TokenType::TypeName(Kind::Double),
        "and" => TokenType::And,
        "or" => TokenType::Or,
        "xor" => TokenType::Caret,
        "true" => TokenType::True,
        "false" => TokenType::False,
        "void" => TokenType::Void,
        "struct" => TokenType::Struct,
        "function" => TokenType::Function,
        _ => return None,
    };
    Some(token_type)
}

/// `[A-Za-z_][A-Za-z0-9_]*`, keywords excluded.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && keyword(text).is_none()
}

fn is_operator_start(c: u8) -> bool {
    b"+-*/%=&|!<>^~,()".contains(&c)
}

/// Splits source text into statements of tokens.
///
/// Statements end at `;` or at a newline not escaped by a trailing `\`.
/// Tokens keep absolute byte spans into `source`, also when the lexer only
/// covers a sub-range of it (a struct body).
pub struct Lexer<'src> {
    source: &'src str,
    end: usize,
    current: usize,
    word_start: Option<usize>,
    max_tokens: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_range(source, 0..source.len(), DEFAULT_MAX_TOKENS)
    }

    pub fn with_range(source: &'src str, range: Range<usize>, max_tokens: usize) -> Self {
        Self {
            source,
            end: range.end.min(source.len()),
            current: range.start,
            word_start: None,
            max_tokens,
        }
    }

    /// Every remaining statement, stopping at the first error.
    pub fn scan_statements(&mut self) -> Result<Vec<Vec<Token<'src>>>, GparseError> {
        let mut statements = Vec::new();
        while let Some(tokens) = self.next_statement()? {
            statements.push(tokens);
        }
        Ok(statements)
    }

    /// Tokens of the next non-empty statement, or `None` once the input is
    /// exhausted.
    pub fn next_statement(&mut self) -> Result<Option<Vec<Token<'src>>>, GparseError> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            let c = self.peek();
            match c {
                b' ' | b'\t' | b'\r' => {
                    self.flush_word(&mut tokens)?;
                    self.current += 1;
                }
                b'\n' | b';' => {
                    self.flush_word(&mut tokens)?;
                    self.current += 1;
                    if !tokens.is_empty() {
                        break;
                    }
                }
                b'\\' => {
                    self.flush_word(&mut tokens)?;
                    self.line_continuation()?;
                }
                b'/' if self.peek_next() == b'/' => {
                    self.flush_word(&mut tokens)?;
                    // The newline stays: it still ends the statement.
                    while !self.is_at_end() && self.peek() != b'\n' {
                        self.current += 1;
                    }
                }
                b'/' if self.peek_next() == b'*' => {
                    self.flush_word(&mut tokens)?;
                    self.block_comment()?;
                }
                b'{' => {
                    self.flush_word(&mut tokens)?;
                    self.block(&mut tokens)?;
                }
                b'}' => {
                    return Err(GparseError::syntax_error(
                        Span::single(self.current),
                        "Unexpected closing bracket".to_string(),
                    ));
                }
                b'+' | b'-' if self.is_exponent_sign() => {
                    self.current += 1;
                }
                c if is_operator_start(c) => {
                    self.flush_word(&mut tokens)?;
                    self.operator(&mut tokens)?;
                }
                _ => {
                    if self.word_start.is_none() {
                        self.word_start = Some(self.current);
                    }
                    self.current += 1;
                }
            }
        }

        if self.is_at_end() {
            self.flush_word(&mut tokens)?;
        }

        if tokens.is_empty() {
            return Ok(None);
        }

        trace!(
            target: "gparse::lexer",
            start = tokens[0].span.start,
            count = tokens.len(),
            "statement tokenized"
        );
        Ok(Some(tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.end
    }

    fn peek(&self) -> u8 {
        self.byte_at(self.current)
    }

    fn peek_next(&self) -> u8 {
        self.byte_at(self.current + 1)
    }

    fn byte_at(&self, pos: usize) -> u8 {
        if pos >= self.end {
            return b'\0';
        }
        self.source.as_bytes()[pos]
    }

    fn push(
        &self,
        tokens: &mut Vec<Token<'src>>,
        token_type: TokenType,
        start: usize,
        end: usize,
    ) -> Result<(), GparseError> {
        let span = Span::new(start, end);
        if tokens.len() >= self.max_tokens {
            return Err(GparseError::limit_error(
                span,
                format!("Statement exceeds the limit of {} tokens", self.max_tokens),
            ));
        }
        tokens.push(Token::new(token_type, &self.source[start..end], span));
        Ok(())
    }

    /// Classifies the pending word: keyword, numeric literal (starts with a
    /// digit) or identifier.
    fn flush_word(&mut self, tokens: &mut Vec<Token<'src>>) -> Result<(), GparseError> {
        let Some(start) = self.word_start.take() else {
            return Ok(());
        };
        let text = &self.source[start..self.current];

        let token_type = if let Some(token_type) = keyword(text) {
            token_type
        } else if text.as_bytes()[0].is_ascii_digit() {
            TokenType::Number
        } else if let Some((offset, c)) = text
            .char_indices()
            .enumerate()
            .find(|(i, (_, c))| {
                !(c.is_ascii_alphabetic() || *c == '_' || (*i > 0 && c.is_ascii_digit()))
            })
            .map(|(_, found)| found)
        {
            return Err(GparseError::syntax_error(
                Span::new(start + offset, start + offset + c.len_utf8()),
                format!("Unexpected character: '{}'", c),
            ));
        } else {
            TokenType::Identifier
        };

        self.push(tokens, token_type, start, self.current)
    }

    /// `+`/`-` right after the exponent marker of a decimal literal.
    fn is_exponent_sign(&self) -> bool {
        let Some(start) = self.word_start else {
            return false;
        };
        let word = &self.source.as_bytes()[start..self.current];
        let hexadecimal = word.len() >= 2 && word[0] == b'0' && matches!(word[1], b'x' | b'X');
        word[0].is_ascii_digit() && !hexadecimal && matches!(word.last(), Some(b'e' | b'E'))
    }

    fn line_continuation(&mut self) -> Result<(), GparseError> {
        let backslash = self.current;
        let mut pos = self.current + 1;
        while matches!(self.byte_at(pos), b' ' | b'\t' | b'\r') {
            pos += 1;
        }
        if pos < self.end && self.byte_at(pos) != b'\n' {
            return Err(GparseError::syntax_error_with_help(
                Span::single(backslash),
                "Unexpected character: '\\'".to_string(),
                "A backslash is only allowed at the end of a line, to continue the statement on the next one.".to_string(),
            ));
        }
        while pos < self.end && matches!(self.byte_at(pos), b' ' | b'\t' | b'\r' | b'\n') {
            pos += 1;
        }
        self.current = pos;
        Ok(())
    }

    fn block_comment(&mut self) -> Result<(), GparseError> {
        let open = self.current;
        let mut pos = self.current + 2;
        while pos + 1 < self.end {
            if self.byte_at(pos) == b'*' && self.byte_at(pos + 1) == b'/' {
                self.current = pos + 2;
                return Ok(());
            }
            pos += 1;
        }
        Err(GparseError::syntax_error(
            Span::new(open, open + 2),
            "Unclosed comment".to_string(),
        ))
    }

    fn block(&mut self, tokens: &mut Vec<Token<'src>>) -> Result<(), GparseError> {
        let open = self.current;
        let mut depth = 0usize;
        let mut pos = self.current;
        while pos < self.end {
            match self.byte_at(pos) {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.push(tokens, TokenType::Block, open, pos + 1)?;
                        self.current = pos + 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        Err(GparseError::syntax_error(
            Span::single(open),
            "Unclosed bracket".to_string(),
        ))
    }

    fn operator(&mut self, tokens: &mut Vec<Token<'src>>) -> Result<(), GparseError> {
        let start = self.current;
        let (token_type, len) = match (self.peek(), self.peek_next()) {
            (b'+', b'+') => (TokenType::PlusPlus, 2),
            (b'+', b'=') => (TokenType::PlusEqual, 2),
            (b'+', _) => (TokenType::Plus, 1),
            (b'-', b'-') => (TokenType::MinusMinus, 2),
            (b'-', b'=') => (TokenType::MinusEqual, 2),
            (b'-', _) => (TokenType::Minus, 1),
            (b'*', b'*') => (TokenType::StarStar, 2),
            (b'*', b'=') => (TokenType::StarEqual, 2),
            (b'*', b'/') => {
                return Err(GparseError::syntax_error(
                    Span::new(start, start + 2),
                    "Unexpected closing comment".to_string(),
                ));
            }
            (b'*', _) => (TokenType::Star, 1),
            (b'/', b'=') => (TokenType::SlashEqual, 2),
            (b'/', _) => (TokenType::Slash, 1),
            (b'%', b'%') => (TokenType::PercentPercent, 2),
            (b'%', _) => (TokenType::Percent, 1),
            (b'=', b'=') => (TokenType::EqualEqual, 2),
            (b'=', _) => (TokenType::Equal, 1),
            (b'&', b'&') => (TokenType::And, 2),
            (b'&', b'=') => (TokenType::AmpersandEqual, 2),
            (b'&', _) => (TokenType::Ampersand, 1),
            (b'|', b'|') => (TokenType::Or, 2),
            (b'|', b'=') => (TokenType::PipeEqual, 2),
            (b'|', _) => (TokenType::Pipe, 1),
            (b'!', b'=') => (TokenType::BangEqual, 2),
            (b'!', _) => (TokenType::Bang, 1),
            (b'<', b'=') => (TokenType::LessEqual, 2),
            (b'<', b'<') => (TokenType::ShiftLeft, 2),
            (b'<', _) => (TokenType::Less, 1),
            (b'>', b'=') => (TokenType::GreaterEqual, 2),
            (b'>', b'>') => (TokenType::ShiftRight, 2),
            (b'>', _) => (TokenType::Greater, 1),
            (b'^', b'=') => (TokenType::CaretEqual, 2),
            (b'^', _) => (TokenType::Caret, 1),
            (b'~', _) => (TokenType::Tilde, 1),
            (b',', _) => (TokenType::Comma, 1),
            (b'(', _) => (TokenType::LeftParen, 1),
            (b')', _) => (TokenType::RightParen, 1),
            (c, _) => {
                return Err(GparseError::syntax_error(
                    Span::single(start),
                    format!("Unexpected character: '{}'", c as char),
                ));
            }
        };
        self.current += len;
        self.push(tokens, token_type, start, self.current)
    }
}
