use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::numeric::NumericError;

/// Byte range `[start, end)` into the executed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Zero-width span, used for positions past the last token.
    pub fn at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start, other.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    TypeError,
    NameError,
    LimitError,
    ArithmeticError,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "Syntax Error",
            ErrorKind::TypeError => "Type Error",
            ErrorKind::NameError => "Name Error",
            ErrorKind::LimitError => "Limit Error",
            ErrorKind::ArithmeticError => "Arithmetic Error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GparseError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl GparseError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn new_with_help(kind: ErrorKind, span: Span, message: String, help: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: Some(help),
        }
    }

    pub fn syntax_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::SyntaxError, span, message)
    }

    pub fn syntax_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::SyntaxError, span, message, help)
    }

    pub fn type_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::TypeError, span, message)
    }

    pub fn type_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::TypeError, span, message, help)
    }

    pub fn name_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::NameError, span, message)
    }

    pub fn name_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::NameError, span, message, help)
    }

    pub fn limit_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::LimitError, span, message)
    }

    pub fn arithmetic_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ArithmeticError, span, message)
    }

    /// Places a numeric engine failure at the operator that caused it.
    pub fn from_numeric(error: NumericError, span: Span) -> Self {
        match error {
            NumericError::DivisionByZero => Self::arithmetic_error(span, error.to_string()),
            NumericError::FloatEquality(_) => Self::type_error_with_help(
                span,
                error.to_string(),
                "Test whether the difference lies within a tolerance, e.g. `a - b < 0.0001 && b - a < 0.0001`.".to_string(),
            ),
            NumericError::ImplicitCast { .. } => Self::type_error_with_help(
                span,
                error.to_string(),
                "Use a type keyword to convert explicitly, e.g. `int(flag)`.".to_string(),
            ),
            _ => Self::type_error(span, error.to_string()),
        }
    }

    /// 0-based column of the error, counted in bytes from the start of the
    /// executed text.
    pub fn column(&self) -> usize {
        self.span.start
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");

        let color = match self.kind {
            ErrorKind::SyntaxError => Color::Red,
            ErrorKind::TypeError => Color::Yellow,
            ErrorKind::NameError => Color::Magenta,
            ErrorKind::LimitError => Color::Blue,
            ErrorKind::ArithmeticError => Color::Magenta,
        };

        // ariadne needs a non-empty label to draw the caret
        let end = self.span.end.max(self.span.start + 1);

        let mut report_builder = Report::build(ReportKind::Error, filename, self.span.start)
            .with_message(format!("{}: {}", self.kind.label().fg(color), self.message))
            .with_label(
                Label::new((filename, self.span.start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder = report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if let Err(error) = report_builder
            .finish()
            .eprint((filename, Source::from(source)))
        {
            eprintln!("{}: {} (column {})", self.kind.label(), self.message, self.column());
            tracing::warn!(target: "gparse::parser", %error, "failed to render diagnostic");
        }
    }
}
