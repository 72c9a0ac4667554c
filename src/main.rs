use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::interpreter::Interpreter;
use lox::parser::{Parser, Stmt};
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Emit the token list as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program, or starts a REPL without one
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with the module path and source line of each record.
    Builder::new()
        .format(|buf, record| {
            // Strip 'treelox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn missing_filename(subcommand: &str) -> ! {
    eprintln!("Usage: treelox {} <filename>", subcommand);
    std::process::exit(64);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                missing_filename("tokenize");
            };

            info!("Running Tokenize subcommand");

            let buf = read_file(filename)?;
            let scanner = Scanner::new(&buf);
            let (tokens, errors) = scanner.scan_tokens();

            for e in &errors {
                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in &tokens {
                    println!("{}", token);
                }
            }

            if !errors.is_empty() {
                debug!("Tokenization failed, exiting with code 65");

                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                missing_filename("parse");
            };

            info!("Running Parse subcommand");

            let buf = read_file(filename)?;
            let (tokens, errors) = Scanner::new(&buf).scan_tokens();

            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            let mut parser = Parser::new(&tokens);

            match parser.parse_expression() {
                Ok(expr) => {
                    info!("Expression parsed successfully");

                    let ast_str = AstPrinter::print(&expr);

                    debug!("AST: {}", ast_str);
                    println!("{}", ast_str);
                }

                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                missing_filename("evaluate");
            };

            info!("Running Evaluate subcommand");

            let buf = read_file(filename)?;
            let (tokens, errors) = Scanner::new(&buf).scan_tokens();

            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            let mut parser = Parser::new(&tokens);

            let expr = match parser.parse_expression() {
                Ok(expr) => expr,

                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => {
                    debug!("Evaluation debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(70);
                }
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");

                let buf = read_file(filename)?;
                let (tokens, errors) = Scanner::new(&buf).scan_tokens();

                if !errors.is_empty() {
                    for e in &errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }

                let (statements, errors) = Parser::new(&tokens).parse();

                if !errors.is_empty() {
                    for e in &errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }

                info!("Parsed {} statements", statements.len());

                let mut interpreter = Interpreter::new();

                let resolve_errors = Resolver::new(&mut interpreter).resolve(&statements);

                if !resolve_errors.is_empty() {
                    for e in &resolve_errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }

                match interpreter.interpret(&statements) {
                    Ok(()) => {
                        info!("Program executed successfully");
                    }

                    Err(e) => {
                        debug!("Runtime debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(70);
                    }
                }
            }

            None => {
                info!("No filepath provided, starting REPL");

                run_prompt()?;
            }
        },
    }

    Ok(())
}

/// Interactive prompt: one persistent interpreter, one line at a time.
/// Errors on a line are reported and the prompt continues; bindings made on
/// earlier lines remain visible.  A line holding a single bare expression
/// echoes its value.
///
/// Each line's source, tokens, and statements are leaked to `'static`:
/// closures defined on one line may be called from any later line, so their
/// AST must outlive the loop iteration.  The per-line allocations are
/// reclaimed by the OS at process exit.
fn run_prompt() -> Result<()> {
    let stdin = io::stdin();
    let mut interpreter: Interpreter<'static> = Interpreter::new();
    let mut next_id: u32 = 0;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // Ctrl-D
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        let src: &'static [u8] = Vec::leak(line.into_bytes());

        let (tokens, errors) = Scanner::new(src).scan_tokens();

        if !errors.is_empty() {
            for e in &errors {
                eprintln!("{}", e);
            }

            continue;
        }

        let tokens: &'static [Token<'static>] = Vec::leak(tokens);

        let mut parser = Parser::with_base_id(tokens, next_id);
        let (statements, errors) = parser.parse();
        next_id = parser.next_id();

        if !errors.is_empty() {
            for e in &errors {
                eprintln!("{}", e);
            }

            continue;
        }

        let statements: &'static [Stmt<'static>] = Vec::leak(statements);

        let resolve_errors = Resolver::new(&mut interpreter).resolve(statements);

        if !resolve_errors.is_empty() {
            for e in &resolve_errors {
                eprintln!("{}", e);
            }

            continue;
        }

        // echo a single bare expression instead of discarding its value
        if let [Stmt::Expression(expr)] = statements {
            match interpreter.evaluate(expr) {
                Ok(value) => println!("{}", value),
                Err(e) => eprintln!("{}", e),
            }

            continue;
        }

        if let Err(e) = interpreter.interpret(statements) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}
