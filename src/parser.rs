use std::ops::Range;

use tracing::debug;

use crate::error::{GparseError, Span};
use crate::evaluator::Evaluator;
use crate::lexer::{is_identifier, Lexer, Token, TokenType, DEFAULT_MAX_TOKENS};
use crate::scope::{ExternalRef, Scope, Variable};
use crate::value::{Kind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Assignments to undeclared names fail instead of declaring them, and
    /// assignments keep the target's kind.
    pub explicit_declarations: bool,
    pub max_tokens: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            explicit_declarations: false,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    /// The text held no statement.
    NoCommand,
}

/// An evaluation session: the global scope, the last expression result and
/// the last error survive between calls to [`Parser::execute`].
///
/// Variables bound with [`Parser::bind_external`] borrow host storage for
/// `'h`, so the host's values must outlive the parser.
pub struct Parser<'h> {
    global: Scope<'h>,
    options: ParserOptions,
    ans: Option<Value>,
    last_error: Option<GparseError>,
}

impl Default for Parser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Parser<'h> {
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            global: Scope::global(),
            options,
            ans: None,
            last_error: None,
        }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    pub fn set_explicit_declarations(&mut self, explicit: bool) {
        self.options.explicit_declarations = explicit;
    }

    pub fn explicit_declarations(&self) -> bool {
        self.options.explicit_declarations
    }

    /// Runs every statement of `text`, stopping at the first error. Effects
    /// of the statements before the failing one are kept.
    pub fn execute(&mut self, text: &str) -> Status {
        self.last_error = None;
        match run_code(
            text,
            0..text.len(),
            &mut self.global,
            &self.options,
            &mut self.ans,
        ) {
            Ok(0) => Status::NoCommand,
            Ok(_) => Status::Ok,
            Err(error) => {
                debug!(
                    target: "gparse::parser",
                    kind = ?error.kind,
                    column = error.column(),
                    message = %error.message,
                    "execution failed"
                );
                self.last_error = Some(error);
                Status::Error
            }
        }
    }

    /// Result of the last top-level expression statement.
    pub fn ans(&self) -> Option<Value> {
        self.ans
    }

    /// `ans` widened to `f64`, NaN before the first result.
    pub fn ans_as_double(&self) -> f64 {
        self.ans.map_or(f64::NAN, |value| value.as_double())
    }

    pub fn last_error(&self) -> Option<&GparseError> {
        self.last_error.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|error| error.message.as_str())
    }

    pub fn error_column(&self) -> Option<usize> {
        self.last_error.as_ref().map(|error| error.column())
    }

    /// Makes host storage visible to scripts as a global variable of the
    /// reference's kind.
    pub fn bind_external(
        &mut self,
        name: &str,
        reference: ExternalRef<'h>,
    ) -> Result<&Variable<'h>, GparseError> {
        if !is_identifier(name) {
            return Err(GparseError::syntax_error(
                Span::at(0),
                format!("'{}' is not a valid variable name", name),
            ));
        }
        debug!(target: "gparse::parser", name, kind = %reference.kind(), "binding host variable");
        self.global
            .bind_external(name, reference)
            .map(|variable| &*variable)
            .map_err(|collision| GparseError::name_error(Span::at(0), collision.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&Variable<'h>> {
        self.global.find(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Variable<'h>> {
        self.global.find_mut(name)
    }

    pub fn global(&self) -> &Scope<'h> {
        &self.global
    }
}

/// Drives the statements found in `source[range]` against `scope`. Returns
/// how many statements ran.
fn run_code(
    source: &str,
    range: Range<usize>,
    scope: &mut Scope<'_>,
    options: &ParserOptions,
    ans: &mut Option<Value>,
) -> Result<usize, GparseError> {
    let mut lexer = Lexer::with_range(source, range, options.max_tokens);
    let mut count = 0;

    while let Some(tokens) = lexer.next_statement()? {
        count += 1;
        debug!(
            target: "gparse::parser",
            start = tokens[0].span.start,
            tokens = tokens.len(),
            "executing statement"
        );

        let mut statement = Statement::new(&tokens);
        match (tokens[0].token_type, tokens.get(1).map(|token| token.token_type)) {
            (TokenType::TypeName(kind), None | Some(TokenType::Identifier)) => {
                declarations(&mut statement, kind, scope, options)?
            }
            (TokenType::Struct, _) => structure(source, &mut statement, scope, options)?,
            (TokenType::Function, _) => function(&mut statement)?,
            (TokenType::Void, _) => {
                return Err(GparseError::syntax_error_with_help(
                    tokens[0].span,
                    "Unexpected 'void'".to_string(),
                    "'void' is only valid as a function return type or parameter list.".to_string(),
                ));
            }
            _ => {
                let mut evaluator = Evaluator::new(scope, options.explicit_declarations);
                let value = evaluator.evaluate(&tokens)?;
                evaluator.commit()?;
                *ans = Some(value);
            }
        }
    }

    Ok(count)
}

/// `type name [= expr] {, name [= expr]}`
///
/// Nothing is declared unless the whole list succeeds.
fn declarations(
    statement: &mut Statement,
    kind: Kind,
    scope: &mut Scope<'_>,
    options: &ParserOptions,
) -> Result<(), GparseError> {
    statement.advance();
    let mut evaluator = Evaluator::new(scope, options.explicit_declarations);

    loop {
        let name = statement.consume(
            |token_type| token_type == TokenType::Identifier,
            "Expecting a variable name",
        )?;
        if evaluator.lookup(name.lexeme).is_some() {
            return Err(GparseError::name_error(
                name.span,
                format!("Variable '{}' is already declared", name.lexeme),
            ));
        }

        let value = if let Some(equal) = statement.match_type(TokenType::Equal) {
            let initializer = statement.until_comma();
            if initializer.is_empty() {
                return Err(GparseError::syntax_error(
                    equal.span,
                    "Expecting an expression after '='".to_string(),
                ));
            }
            let value = evaluator.evaluate(initializer)?;
            let span = initializer[0].span.to(&initializer[initializer.len() - 1].span);
            value.cast_implicit(kind).ok_or_else(|| {
                GparseError::type_error_with_help(
                    span,
                    format!("Cannot initialize {} '{}' with a {} value", kind, name.lexeme, value.type_name()),
                    format!("Convert explicitly, e.g. `{} {} = {}(...)`.", kind, name.lexeme, kind),
                )
            })?
        } else {
            kind.zero()
        };

        let more = match statement.advance() {
            None => false,
            Some(token) if token.token_type == TokenType::Comma => true,
            Some(token) => {
                return Err(GparseError::syntax_error(
                    token.span,
                    "Expecting an initialization".to_string(),
                ));
            }
        };

        evaluator.declare(name, value);

        if !more {
            return evaluator.commit();
        }
    }
}

/// `struct name { body }`: the body runs against a new scope, which is
/// registered only once the whole body has run.
fn structure(
    source: &str,
    statement: &mut Statement,
    scope: &mut Scope<'_>,
    options: &ParserOptions,
) -> Result<(), GparseError> {
    statement.advance();
    let name = statement.consume(
        |token_type| token_type == TokenType::Identifier,
        "Expecting a struct name",
    )?;
    let block = statement.consume(
        |token_type| token_type == TokenType::Block,
        "Expecting a '{' block after the struct name",
    )?;
    statement.finish()?;

    if scope.find_struct(name.lexeme).is_some() {
        return Err(GparseError::name_error(
            name.span,
            format!("Struct '{}' is already declared", name.lexeme),
        ));
    }

    // Expression results inside the body never reach the caller's `ans`.
    let mut nested = Scope::new(name.lexeme);
    let mut body_ans = None;
    run_code(source, block.block_contents(), &mut nested, options, &mut body_ans)?;

    scope
        .declare_struct(nested)
        .map_err(|collision| GparseError::name_error(name.span, collision.to_string()))?;
    debug!(target: "gparse::parser", name = name.lexeme, "struct declared");
    Ok(())
}

/// `function <type|void> name ( [void | type name {, type name}] ) { body }`
///
/// Only the header grammar is checked; the body is not executed.
fn function(statement: &mut Statement) -> Result<(), GparseError> {
    statement.advance();
    statement.consume(
        |token_type| matches!(token_type, TokenType::TypeName(_) | TokenType::Void),
        "Expecting a return type",
    )?;
    let name = statement.consume(
        |token_type| token_type == TokenType::Identifier,
        "Expecting a function name",
    )?;
    statement.consume(
        |token_type| token_type == TokenType::LeftParen,
        "Expecting '(' after the function name",
    )?;

    if statement.match_type(TokenType::Void).is_none() && !statement.check(TokenType::RightParen) {
        loop {
            statement.consume(
                |token_type| matches!(token_type, TokenType::TypeName(_)),
                "Expecting a parameter type",
            )?;
            statement.consume(
                |token_type| token_type == TokenType::Identifier,
                "Expecting a parameter name",
            )?;
            if statement.match_type(TokenType::Comma).is_none() {
                break;
            }
        }
    }

    statement.consume(
        |token_type| token_type == TokenType::RightParen,
        "Expecting ')' after the parameters",
    )?;
    statement.consume(
        |token_type| token_type == TokenType::Block,
        "Expecting a '{' block as the function body",
    )?;
    statement.finish()?;

    debug!(target: "gparse::parser", name = name.lexeme, "function header accepted, body skipped");
    Ok(())
}

/// Cursor over the tokens of one statement.
struct Statement<'t, 'src> {
    tokens: &'t [Token<'src>],
    current: usize,
}

impl<'t, 'src> Statement<'t, 'src> {
    fn new(tokens: &'t [Token<'src>]) -> Self {
        Self { tokens, current: 0 }
    }

    fn peek(&self) -> Option<&'t Token<'src>> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) -> Option<&'t Token<'src>> {
        let token = self.tokens.get(self.current)?;
        self.current += 1;
        Some(token)
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().is_some_and(|token| token.token_type == token_type)
    }

    fn match_type(&mut self, token_type: TokenType) -> Option<&'t Token<'src>> {
        if self.check(token_type) {
            self.advance()
        } else {
            None
        }
    }

    fn consume(
        &mut self,
        accept: impl Fn(TokenType) -> bool,
        message: &str,
    ) -> Result<&'t Token<'src>, GparseError> {
        match self.peek() {
            Some(token) if accept(token.token_type) => {
                self.current += 1;
                Ok(token)
            }
            Some(token) => Err(GparseError::syntax_error(token.span, message.to_string())),
            None => Err(GparseError::syntax_error(self.end_span(), message.to_string())),
        }
    }

    /// Tokens up to the next comma outside brackets, which is left in place.
    fn until_comma(&mut self) -> &'t [Token<'src>] {
        let start = self.current;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.token_type {
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => depth = depth.saturating_sub(1),
                TokenType::Comma if depth == 0 => break,
                _ => {}
            }
            self.current += 1;
        }
        &self.tokens[start..self.current]
    }

    fn finish(&self) -> Result<(), GparseError> {
        match self.peek() {
            Some(token) => Err(GparseError::syntax_error(
                token.span,
                format!("Unexpected '{}' at the end of the statement", token.lexeme),
            )),
            None => Ok(()),
        }
    }

    fn end_span(&self) -> Span {
        self.tokens
            .last()
            .map_or(Span::at(0), |token| Span::at(token.span.end))
    }
}
