// gparse: an embeddable evaluator for a small typed expression and
// statement language.
//
// Hosts create a `Parser`, feed it text with `execute`, and read back the
// typed result (`ans`) or the error with its column. Host-owned storage can
// be bound as script variables with `bind_external`.

// Public modules
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod logging;
pub mod numeric;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod scope;
pub mod value;

// Re-export commonly used items
pub use error::{ErrorKind, GparseError, Span};
pub use evaluator::{Evaluator, Precedence};
pub use lexer::{Lexer, Token, TokenType, DEFAULT_MAX_TOKENS};
pub use numeric::{BinaryOp, NumericError, UnaryOp};
pub use parser::{Parser, ParserOptions, Status};
pub use scope::{ExternalRef, NameCollision, NameTree, Named, Scope, Storage, Variable};
pub use value::{Kind, Value};

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
