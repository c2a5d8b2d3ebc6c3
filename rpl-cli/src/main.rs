//! RPL CLI: evaluate, run, check, and an interactive loop.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/compile error
//! - 2: Integrity failure
//! - 3: Runtime error

mod commands;
mod repl;

use std::process;

use tracing_subscriber::{fmt, EnvFilter};

use commands::Options;

fn init_logging() {
    let filter = EnvFilter::try_from_env("RPL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let (options, rest) = match Options::parse(&args) {
        Ok(parsed) => parsed,
        Err(code) => process::exit(code),
    };

    let Some(command) = rest.first() else {
        print_usage();
        process::exit(1);
    };

    let result = match command.as_str() {
        "eval" => commands::eval(&options, &rest[1..]),
        "run" => commands::run(&options, &rest[1..]),
        "check" => commands::check(&options, &rest[1..]),
        "repl" => repl::repl(&options),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: rpl [--memory <cells>] [--undo <levels>] <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  eval <text>      Compile and run text, print the stack");
    eprintln!("  run <file>       Compile and run a source file, print the stack");
    eprintln!("  check <file>     Run a source file and check memory integrity");
    eprintln!("  repl             Interactive loop (:undo :redo :cont :kill :check :quit)");
    eprintln!();
    eprintln!("Set RPL_LOG to control engine logging (default: warn).");
}
