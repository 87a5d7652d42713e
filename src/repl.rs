use crate::parser::{Parser, ParserOptions, Status};
use std::io::{self, Write};

/// Interactive session. One [`Parser`] lives for the whole session, so
/// variables and `ans` carry over from line to line.
pub fn start(options: ParserOptions) {
    let mut parser = Parser::with_options(options);
    start_with(&mut parser);
}

/// Interactive session continuing `parser`, e.g. after a script ran in it.
pub fn start_with(parser: &mut Parser) {
    println!("gparse v{}", env!("CARGO_PKG_VERSION"));
    println!("Type ':vars' to list variables, ':explicit on|off' to toggle declarations, 'exit' to quit");
    println!();

    loop {
        print!("> ");
        if let Err(error) = io::stdout().flush() {
            eprintln!("Error writing prompt: {}", error);
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D or end of piped input)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }
                if let Some(command) = line.strip_prefix(':') {
                    run_meta_command(command, parser);
                    continue;
                }

                run_repl_command(line, parser);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_repl_command(source: &str, parser: &mut Parser) {
    let previous = parser.ans();
    match parser.execute(source) {
        Status::Ok => {
            // Declarations and struct bodies leave `ans` alone; only echo a
            // fresh result.
            if let Some(value) = parser.ans() {
                if previous != Some(value) || is_expression(source) {
                    println!("{}", value);
                }
            }
        }
        Status::NoCommand => {}
        Status::Error => {
            if let Some(error) = parser.last_error() {
                error.report(source, None);
            }
        }
    }
}

fn is_expression(source: &str) -> bool {
    let first = source.split_whitespace().next().unwrap_or_default();
    !matches!(
        first,
        "bool" | "byte" | "int" | "int64" | "float" | "double" | "struct" | "function"
    )
}

fn run_meta_command(command: &str, parser: &mut Parser) {
    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("vars"), None) => {
            for variable in parser.global().variables().iter() {
                let origin = if variable.is_external() { " (host)" } else { "" };
                println!("{} {} = {}{}", variable.kind(), variable.name(), variable.value(), origin);
            }
            for nested in parser.global().structs().iter() {
                println!("struct {} ({} variables)", nested.name(), nested.variables().len());
            }
        }
        (Some("explicit"), Some("on")) => parser.set_explicit_declarations(true),
        (Some("explicit"), Some("off")) => parser.set_explicit_declarations(false),
        (Some("explicit"), None) => {
            let state = if parser.explicit_declarations() { "on" } else { "off" };
            println!("explicit declarations: {}", state);
        }
        _ => eprintln!("Unknown command ':{}'. Try ':vars' or ':explicit on|off'.", command),
    }
}
