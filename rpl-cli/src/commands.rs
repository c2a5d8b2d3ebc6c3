//! CLI command implementations.

use std::fs;

use rpl_compiler::{compile, compile_words, decompile};
use rpl_vm::{DecompileMode, ExecutionOutcome, ObjPtr, RunError, Runtime, RuntimeConfig};
use tracing::debug;

/// Global flags, accepted anywhere on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Maximum arena size in cells.
    pub memory: Option<usize>,
    /// Undo levels kept by the interactive loop.
    pub undo: Option<usize>,
}

impl Options {
    /// Split flags from positional arguments.
    pub fn parse(args: &[String]) -> Result<(Options, Vec<String>), i32> {
        let mut options = Options::default();
        let mut rest = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--memory" => options.memory = Some(number(arg, iter.next())?),
                "--undo" => options.undo = Some(number(arg, iter.next())?),
                _ => rest.push(arg.clone()),
            }
        }
        Ok((options, rest))
    }

    pub fn config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        if let Some(cells) = self.memory {
            config.max_cells = cells;
            config.initial_cells = config.initial_cells.min(cells);
        }
        if let Some(levels) = self.undo {
            config.undo_levels = levels;
        }
        config
    }
}

fn number(flag: &str, value: Option<&String>) -> Result<usize, i32> {
    let Some(value) = value else {
        eprintln!("error: {flag} requires a value");
        return Err(1);
    };
    value.parse().map_err(|_| {
        eprintln!("error: {flag} expects a number, got '{value}'");
        1
    })
}

/// A runtime with the standard libraries installed.
pub fn runtime(options: &Options) -> Result<Runtime, i32> {
    let mut rt = Runtime::new(options.config()).map_err(|e| {
        eprintln!("error: cannot create runtime: {e}");
        1
    })?;
    rpl_stdlib::install_all(&mut rt).map_err(|e| {
        eprintln!("error: cannot install libraries: {e}");
        1
    })?;
    Ok(rt)
}

fn read_source(input: &str) -> Result<String, i32> {
    fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })
}

pub fn compile_text(rt: &mut Runtime, text: &str) -> Result<ObjPtr, i32> {
    compile(rt, text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })
}

/// Display form of every stack level, bottom first.
pub fn stack_lines(rt: &Runtime) -> Vec<String> {
    rt.data()
        .as_slice()
        .iter()
        .map(|&p| {
            decompile(rt, p, DecompileMode::Display).unwrap_or_else(|e| format!("<{e}>"))
        })
        .collect()
}

/// Print what a run produced. Errors go to stderr and map to exit code 3.
pub fn report(rt: &Runtime, result: Result<ExecutionOutcome, RunError>) -> Result<(), i32> {
    match result {
        Ok(ExecutionOutcome::Completed) | Ok(ExecutionOutcome::CleanExit) => Ok(()),
        Ok(ExecutionOutcome::Halted { cause: None, .. }) => {
            eprintln!("halted");
            Ok(())
        }
        Ok(ExecutionOutcome::Halted {
            cause: Some(error), ..
        }) => {
            eprintln!("runtime error: {} (halted)", rt.error_message(&error));
            Err(3)
        }
        Err(RunError::Aborted { error, blame, .. }) => {
            eprintln!("runtime error: {}", rt.error_message(&error));
            if let Some(text) = blame.and_then(|b| decompile(rt, b, DecompileMode::Edit).ok()) {
                eprintln!("  in: {text}");
            }
            Err(3)
        }
        Err(e) => {
            eprintln!("runtime error: {e}");
            Err(3)
        }
    }
}

fn execute(rt: &mut Runtime, program: ObjPtr) -> Result<(), i32> {
    let result = rt.install(program).map_err(RunError::from).and_then(|()| rt.run());
    debug!(?result, "run finished");
    let status = report(rt, result);
    for line in stack_lines(rt) {
        println!("{line}");
    }
    status
}

/// Compile and run text given on the command line.
pub fn eval(options: &Options, args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: eval requires program text");
        eprintln!("Usage: rpl eval <text>");
        return Err(1);
    }
    let mut rt = runtime(options)?;
    let program = compile_text(&mut rt, &args.join(" "))?;
    execute(&mut rt, program)
}

/// Compile and run a source file.
pub fn run(options: &Options, args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: run requires an input file");
        eprintln!("Usage: rpl run <file>");
        return Err(1);
    }
    let text = read_source(&args[0])?;
    let mut rt = runtime(options)?;
    let program = compile_text(&mut rt, &text)?;
    execute(&mut rt, program)
}

pub fn print_integrity(rt: &Runtime) -> Result<(), i32> {
    match rpl_verifier::check_memory(rt) {
        Ok(()) => Ok(()),
        Err(errors) => {
            for e in &errors {
                eprintln!("error: {e}");
            }
            Err(2)
        }
    }
}

/// Check a compiled file, run it, then check memory before and after
/// compaction.
pub fn check(options: &Options, args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: check requires an input file");
        eprintln!("Usage: rpl check <file>");
        return Err(1);
    }
    let input = &args[0];
    let text = read_source(input)?;
    let mut rt = runtime(options)?;

    let words = compile_words(rt.registry(), &text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    if let Err(e) = rpl_verifier::check_object(rt.registry(), &words) {
        eprintln!("error: {e}");
        return Err(2);
    }
    let program = rt.store_object(&words).map_err(|e| {
        eprintln!("runtime error: {e}");
        3
    })?;

    let result = rt.install(program).map_err(RunError::from).and_then(|()| rt.run());
    report(&rt, result)?;
    print_integrity(&rt)?;
    let freed = rt.compact();
    print_integrity(&rt)?;

    println!(
        "OK: {input} ({} cells, {} live blocks, {freed} cells reclaimed)",
        words.len(),
        rt.store().live_blocks().len()
    );
    Ok(())
}
