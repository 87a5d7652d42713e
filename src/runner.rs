use crate::parser::{Parser, ParserOptions, Status};

/// Executes a whole script in a fresh session and prints the final `ans`.
/// Returns `false` when the script stopped on an error, which has already
/// been reported.
pub fn run(source: &str, filename: Option<&str>, options: ParserOptions) -> bool {
    let mut parser = Parser::with_options(options);
    run_in(&mut parser, source, filename)
}

/// Like [`run`], but against an existing session, which keeps whatever the
/// script declared.
pub fn run_in(parser: &mut Parser, source: &str, filename: Option<&str>) -> bool {
    match parser.execute(source) {
        Status::Ok => {
            if let Some(value) = parser.ans() {
                println!("{}", value);
            }
            true
        }
        Status::NoCommand => true,
        Status::Error => {
            if let Some(error) = parser.last_error() {
                error.report(source, filename);
            }
            false
        }
    }
}
