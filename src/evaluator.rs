use tracing::debug;

use crate::error::{GparseError, Span};
use crate::lexer::{Token, TokenType};
use crate::numeric::{self, BinaryOp, NumericError, UnaryOp};
use crate::scope::Scope;
use crate::value::{Kind, Value};

/// Binary operator classes, loosest binding first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    LogicalOr,
    LogicalAnd,
    Comparison,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Additive,
    Multiplicative,
    Power,
}

impl Precedence {
    pub const ALL: [Precedence; 10] = [
        Precedence::LogicalOr,
        Precedence::LogicalAnd,
        Precedence::Comparison,
        Precedence::BitOr,
        Precedence::BitXor,
        Precedence::BitAnd,
        Precedence::Shift,
        Precedence::Additive,
        Precedence::Multiplicative,
        Precedence::Power,
    ];

    pub fn of(token_type: TokenType) -> Option<Precedence> {
        let precedence = match token_type {
            TokenType::Or => Precedence::LogicalOr,
            TokenType::And => Precedence::LogicalAnd,
            TokenType::EqualEqual
            | TokenType::BangEqual
            | TokenType::Less
            | TokenType::LessEqual
            | TokenType::Greater
            | TokenType::GreaterEqual => Precedence::Comparison,
            TokenType::Pipe => Precedence::BitOr,
            TokenType::Caret => Precedence::BitXor,
            TokenType::Ampersand => Precedence::BitAnd,
            TokenType::ShiftLeft | TokenType::ShiftRight => Precedence::Shift,
            TokenType::Plus | TokenType::Minus => Precedence::Additive,
            TokenType::Star | TokenType::Slash | TokenType::Percent | TokenType::PercentPercent => {
                Precedence::Multiplicative
            }
            TokenType::StarStar => Precedence::Power,
            _ => return None,
        };
        Some(precedence)
    }
}

fn binary_op(token_type: TokenType) -> Option<BinaryOp> {
    let op = match token_type {
        TokenType::Plus => BinaryOp::Add,
        TokenType::Minus => BinaryOp::Subtract,
        TokenType::Star => BinaryOp::Multiply,
        TokenType::Slash => BinaryOp::Divide,
        TokenType::PercentPercent => BinaryOp::IntDivide,
        TokenType::Percent => BinaryOp::Remainder,
        TokenType::StarStar => BinaryOp::Power,
        TokenType::EqualEqual => BinaryOp::Equal,
        TokenType::BangEqual => BinaryOp::NotEqual,
        TokenType::Less => BinaryOp::Less,
        TokenType::LessEqual => BinaryOp::LessEqual,
        TokenType::Greater => BinaryOp::Greater,
        TokenType::GreaterEqual => BinaryOp::GreaterEqual,
        TokenType::And => BinaryOp::And,
        TokenType::Or => BinaryOp::Or,
        TokenType::Ampersand => BinaryOp::BitAnd,
        TokenType::Pipe => BinaryOp::BitOr,
        TokenType::Caret => BinaryOp::BitXor,
        TokenType::ShiftLeft => BinaryOp::ShiftLeft,
        TokenType::ShiftRight => BinaryOp::ShiftRight,
        _ => return None,
    };
    Some(op)
}

/// Operator applied by a compound assignment; `None` for plain `=`.
fn compound_op(token_type: TokenType) -> Option<BinaryOp> {
    match token_type {
        TokenType::PlusEqual => Some(BinaryOp::Add),
        TokenType::MinusEqual => Some(BinaryOp::Subtract),
        TokenType::StarEqual => Some(BinaryOp::Multiply),
        TokenType::SlashEqual => Some(BinaryOp::Divide),
        TokenType::AmpersandEqual => Some(BinaryOp::BitAnd),
        TokenType::PipeEqual => Some(BinaryOp::BitOr),
        TokenType::CaretEqual => Some(BinaryOp::BitXor),
        _ => None,
    }
}

/// Every excess `)` and every unclosed `(` is an error.
fn check_brackets(tokens: &[Token]) -> Result<(), GparseError> {
    let mut depth = 0usize;
    for token in tokens {
        match token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => {
                if depth == 0 {
                    return Err(GparseError::syntax_error(
                        token.span,
                        "Unexpected closing bracket".to_string(),
                    ));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    match tokens.last() {
        Some(last) if depth > 0 => Err(GparseError::syntax_error_with_help(
            Span::at(last.span.end),
            "Unclosed bracket".to_string(),
            format!("{} ')' missing at the end of the expression.", depth),
        )),
        _ => Ok(()),
    }
}

/// Indices of operators at nesting depth zero that follow a complete operand.
/// Anything else in operator position is a prefix operator or an error.
fn topmost_positions(tokens: &[Token]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && i > 0 && tokens[i - 1].token_type.ends_operand() => {
                positions.push(i)
            }
            _ => {}
        }
    }
    positions
}

fn expecting_expression(operator: &Token) -> GparseError {
    GparseError::syntax_error(
        operator.span,
        format!("Expecting an expression after '{}'", operator.lexeme),
    )
}

/// A store held back until the statement that made it has succeeded.
#[derive(Debug)]
struct PendingWrite {
    name: String,
    value: Value,
    span: Span,
}

/// Reduces the tokens of one expression to a value by splitting the span at
/// its loosest-binding operator and recursing on both halves.
///
/// Assignments, increments and declarations are staged: reads see them at
/// once, but the scope only changes on [`Evaluator::commit`]. Dropping the
/// evaluator after an error discards them.
pub struct Evaluator<'a, 'h> {
    scope: &'a mut Scope<'h>,
    explicit_declarations: bool,
    pending: Vec<PendingWrite>,
}

impl<'a, 'h> Evaluator<'a, 'h> {
    pub fn new(scope: &'a mut Scope<'h>, explicit_declarations: bool) -> Self {
        Self {
            scope,
            explicit_declarations,
            pending: Vec::new(),
        }
    }

    /// Current value of `name`, staged writes included.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.pending
            .iter()
            .rev()
            .find(|write| write.name == name)
            .map(|write| write.value)
            .or_else(|| self.scope.find(name).map(|variable| variable.value()))
    }

    /// Stages a new variable. The caller has checked that the name is free.
    pub fn declare(&mut self, name: &Token, value: Value) {
        self.stage(name, value);
    }

    /// Applies the staged writes in order and consumes the evaluator.
    pub fn commit(self) -> Result<(), GparseError> {
        for write in self.pending {
            match self.scope.find_mut(&write.name) {
                Some(variable) => {
                    variable
                        .assign_dynamic(write.value)
                        .map_err(|error| GparseError::from_numeric(error, write.span))?;
                }
                None => {
                    debug!(target: "gparse::evaluator", name = %write.name, kind = %write.value.kind(), "variable declared");
                    self.scope
                        .declare_value(&write.name, write.value)
                        .map_err(|collision| GparseError::name_error(write.span, collision.to_string()))?;
                }
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, tokens: &[Token]) -> Result<Value, GparseError> {
        if tokens.is_empty() {
            return Err(GparseError::syntax_error(
                Span::at(0),
                "Expecting an expression".to_string(),
            ));
        }
        if tokens.len() > 1 {
            check_brackets(tokens)?;
        }
        self.expression(tokens)
    }

    fn expression(&mut self, tokens: &[Token]) -> Result<Value, GparseError> {
        if tokens.len() == 1 {
            return self.primary(&tokens[0]);
        }

        let topmost = topmost_positions(tokens);

        if let Some(&i) = topmost
            .iter()
            .find(|&&i| tokens[i].token_type.is_assignment())
        {
            return self.assignment(tokens, i);
        }

        for class in Precedence::ALL {
            let found = topmost
                .iter()
                .rev()
                .find(|&&i| Precedence::of(tokens[i].token_type) == Some(class));
            if let Some(&i) = found {
                return self.binary(tokens, i);
            }
        }

        if let Some(value) = self.prefix(tokens)? {
            return Ok(value);
        }

        if let [name, operator] = tokens {
            if name.token_type == TokenType::Identifier
                && matches!(operator.token_type, TokenType::PlusPlus | TokenType::MinusMinus)
            {
                return self.increment(name, operator, true);
            }
        }

        if tokens[0].token_type == TokenType::LeftParen {
            return self.group(tokens);
        }

        Err(GparseError::syntax_error(
            tokens[0].span,
            "Expression error".to_string(),
        ))
    }

    fn primary(&mut self, token: &Token) -> Result<Value, GparseError> {
        match token.token_type {
            TokenType::Number => Value::parse_literal(token.lexeme).ok_or_else(|| {
                GparseError::syntax_error_with_help(
                    token.span,
                    format!("Malformed numeric literal '{}'", token.lexeme),
                    "Literals are decimal (`12`, `1.5e3`, `2.0f`, `7L`), hexadecimal (`0xff`) or binary (`0b101`), within the int64 range.".to_string(),
                )
            }),
            TokenType::True => Ok(Value::Bool(true)),
            TokenType::False => Ok(Value::Bool(false)),
            TokenType::Identifier => self.existing(token),
            _ => Err(GparseError::syntax_error(
                token.span,
                format!("Unexpected '{}'", token.lexeme),
            )),
        }
    }

    fn binary(&mut self, tokens: &[Token], i: usize) -> Result<Value, GparseError> {
        let operator = &tokens[i];
        if i + 1 == tokens.len() {
            return Err(expecting_expression(operator));
        }
        let left = self.expression(&tokens[..i])?;
        let right = self.expression(&tokens[i + 1..])?;

        let Some(op) = binary_op(operator.token_type) else {
            return Err(GparseError::syntax_error(
                operator.span,
                "Expression error".to_string(),
            ));
        };
        numeric::binary(op, left, right).map_err(|error| GparseError::from_numeric(error, operator.span))
    }

    fn assignment(&mut self, tokens: &[Token], i: usize) -> Result<Value, GparseError> {
        let operator = &tokens[i];
        let target = &tokens[0];
        if i != 1 || target.token_type != TokenType::Identifier {
            return Err(GparseError::syntax_error_with_help(
                target.span.to(&tokens[i - 1].span),
                "Invalid assignment target".to_string(),
                "Only a single variable name can appear on the left of an assignment.".to_string(),
            ));
        }
        if i + 1 == tokens.len() {
            return Err(expecting_expression(operator));
        }

        let mut value = self.expression(&tokens[i + 1..])?;
        let name = target.lexeme;

        if let Some(op) = compound_op(operator.token_type) {
            let current = self.existing(target)?;
            value = numeric::binary(op, current, value)
                .map_err(|error| GparseError::from_numeric(error, operator.span))?;
        }

        let explicit = self.explicit_declarations;
        let kept = match self.lookup(name) {
            Some(current) if explicit || self.is_external(name) => Some(current.kind()),
            Some(_) => None,
            None if explicit => {
                return Err(GparseError::name_error_with_help(
                    target.span,
                    format!("Undeclared variable '{}'", name),
                    format!(
                        "Explicit declarations are on; declare it first, e.g. `{} {} = ...`.",
                        value.type_name(),
                        name
                    ),
                ));
            }
            None => None,
        };
        self.store(target, operator, value, kept)
    }

    /// Prefix operators and explicit casts. `None` when the span does not
    /// start with one.
    fn prefix(&mut self, tokens: &[Token]) -> Result<Option<Value>, GparseError> {
        let operator = &tokens[0];
        let rest = &tokens[1..];

        let op = match operator.token_type {
            TokenType::Plus => UnaryOp::Plus,
            TokenType::Minus => UnaryOp::Negate,
            TokenType::Bang => UnaryOp::Not,
            TokenType::Tilde => UnaryOp::BitInvert,
            TokenType::TypeName(kind) => {
                let value = self.expression(rest)?;
                return Ok(Some(value.cast_explicit(kind)));
            }
            TokenType::PlusPlus | TokenType::MinusMinus => {
                return match rest {
                    [name] if name.token_type == TokenType::Identifier => {
                        self.increment(name, operator, false).map(Some)
                    }
                    _ => Err(GparseError::syntax_error(
                        operator.span,
                        format!("'{}' needs a single variable name", operator.lexeme),
                    )),
                };
            }
            _ => return Ok(None),
        };

        let operand = self.expression(rest)?;
        numeric::unary(op, operand)
            .map(Some)
            .map_err(|error| GparseError::from_numeric(error, operator.span))
    }

    /// `++`/`--` on a variable; postfix yields the value before the update.
    fn increment(&mut self, name: &Token, operator: &Token, postfix: bool) -> Result<Value, GparseError> {
        let op = if operator.token_type == TokenType::PlusPlus {
            BinaryOp::Add
        } else {
            BinaryOp::Subtract
        };
        let old = self.existing(name)?;
        let new = numeric::binary(op, old, old.kind().one())
            .map_err(|error| GparseError::from_numeric(error, operator.span))?;
        let new = self.store(name, operator, new, Some(old.kind()))?;
        Ok(if postfix { old } else { new })
    }

    fn group(&mut self, tokens: &[Token]) -> Result<Value, GparseError> {
        let mut depth = 0usize;
        let mut close = None;
        for (i, token) in tokens.iter().enumerate() {
            match token.token_type {
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let Some(close) = close else {
            return Err(GparseError::syntax_error(
                tokens[0].span,
                "Unclosed bracket".to_string(),
            ));
        };
        if close == 1 {
            return Err(GparseError::syntax_error(
                tokens[0].span.to(&tokens[1].span),
                "Expecting an expression between brackets".to_string(),
            ));
        }
        if close + 1 != tokens.len() {
            return Err(GparseError::syntax_error(
                tokens[close + 1].span,
                "Expression error".to_string(),
            ));
        }
        self.expression(&tokens[1..close])
    }

    /// Stages `value` for `target`, converted to `kind` when the target's
    /// kind is fixed.
    fn store(
        &mut self,
        target: &Token,
        operator: &Token,
        value: Value,
        kind: Option<Kind>,
    ) -> Result<Value, GparseError> {
        let stored = match kind {
            Some(kind) => value.cast_implicit(kind).ok_or_else(|| {
                GparseError::from_numeric(
                    NumericError::ImplicitCast {
                        from: value.kind(),
                        to: kind,
                    },
                    operator.span,
                )
            })?,
            None => value,
        };
        self.stage(target, stored);
        Ok(stored)
    }

    fn stage(&mut self, target: &Token, value: Value) {
        self.pending.push(PendingWrite {
            name: target.lexeme.to_string(),
            value,
            span: target.span,
        });
    }

    fn is_external(&self, name: &str) -> bool {
        self.scope.find(name).is_some_and(|variable| variable.is_external())
    }

    fn existing(&self, name: &Token) -> Result<Value, GparseError> {
        self.lookup(name.lexeme).ok_or_else(|| {
            GparseError::name_error(name.span, format!("Undeclared variable '{}'", name.lexeme))
        })
    }
}
