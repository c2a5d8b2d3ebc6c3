//! Line-oriented interactive loop.
//!
//! Each input line is compiled and run as one command with an undo level
//! recorded first. Lines starting with `:` are loop directives.

use std::io::{self, BufRead};

use rpl_vm::{ExecutionOutcome, RunError, Runtime};

use crate::commands::{self, Options};

/// What the loop does after a line.
enum Next {
    Continue,
    Quit,
}

fn print_stack(rt: &Runtime) {
    let lines = commands::stack_lines(rt);
    let depth = lines.len();
    for (i, line) in lines.iter().enumerate() {
        println!("{}: {line}", depth - i);
    }
}

/// Run a result through the shared reporting, ending the loop on EXITRPL.
fn after_run(rt: &Runtime, result: Result<ExecutionOutcome, RunError>) -> Next {
    let exited = matches!(result, Ok(ExecutionOutcome::CleanExit));
    // The exit code only matters for one-shot commands.
    let _ = commands::report(rt, result);
    if exited {
        Next::Quit
    } else {
        print_stack(rt);
        Next::Continue
    }
}

fn directive(rt: &mut Runtime, name: &str) -> Next {
    match name {
        "undo" => {
            rt.undo();
            print_stack(rt);
        }
        "redo" => {
            rt.redo();
            print_stack(rt);
        }
        "cont" => {
            let result = rt.resume();
            return after_run(rt, result);
        }
        "kill" => match rt.kill() {
            Ok(()) => print_stack(rt),
            Err(e) => eprintln!("error: {e}"),
        },
        "check" => {
            if commands::print_integrity(rt).is_ok() {
                println!("OK");
            }
        }
        "quit" | "q" => return Next::Quit,
        other => eprintln!("error: unknown directive ':{other}'"),
    }
    Next::Continue
}

fn line(rt: &mut Runtime, text: &str) -> Next {
    let text = text.trim();
    if let Some(name) = text.strip_prefix(':') {
        return directive(rt, name.trim());
    }
    if text.is_empty() {
        return Next::Continue;
    }
    let Ok(program) = commands::compile_text(rt, text) else {
        return Next::Continue;
    };
    rt.prepare_undo();
    let result = rt.install(program).map_err(RunError::from).and_then(|()| rt.run());
    after_run(rt, result)
}

/// Read commands from stdin until end of input, `:quit` or EXITRPL.
pub fn repl(options: &Options) -> Result<(), i32> {
    let mut rt = commands::runtime(options)?;
    for input in io::stdin().lock().lines() {
        let input = input.map_err(|e| {
            eprintln!("error: cannot read input: {e}");
            1
        })?;
        if let Next::Quit = line(&mut rt, &input) {
            break;
        }
    }
    Ok(())
}
