use clap::{value_parser, Arg, ArgAction, Command};
use gparse::logging::{self, LogFormat};
use gparse::{repl, runner, Parser, ParserOptions, DEFAULT_MAX_TOKENS};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = Command::new("gparse")
        .about("A typed expression and statement evaluator with precise error diagnostics")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("explicit")
                .long("explicit")
                .help("Require variables to be declared before assignment")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-tokens")
                .long("max-tokens")
                .value_name("N")
                .help("Maximum number of tokens in one statement")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .value_name("LEVEL")
                .help("Log level for diagnostics on stderr (error, warn, info, debug, trace)"),
        )
        .get_matches();

    if let Some(level) = matches.get_one::<String>("log") {
        match logging::parse_level(level) {
            Some(level) => logging::init(level, LogFormat::Compact),
            None => {
                eprintln!("Error: unknown log level '{}'", level);
                return ExitCode::FAILURE;
            }
        }
    }

    let options = ParserOptions {
        explicit_declarations: matches.get_flag("explicit"),
        max_tokens: matches
            .get_one::<usize>("max-tokens")
            .copied()
            .unwrap_or(DEFAULT_MAX_TOKENS),
    };

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => {
            run_file(file_path, &mut Parser::with_options(options))
        }
        Some(file_path) => {
            // The prompt continues the script's session.
            let mut parser = Parser::with_options(options);
            let status = run_file(file_path, &mut parser);
            repl::start_with(&mut parser);
            status
        }
        None => {
            repl::start(options);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &str, parser: &mut Parser) -> ExitCode {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return ExitCode::FAILURE;
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.display().to_string();
            if runner::run_in(parser, &source, Some(&filename)) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}
