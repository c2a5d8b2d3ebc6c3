//! Token stream to object cells, one library at a time.
//!
//! The output is always a single program object. Composites are tracked on
//! a construct stack; their prolog is emitted with size 0 and patched when
//! the matching close arrives.

use rpl_common::{LibId, Word};
use rpl_vm::libs::program::SEMI;
use rpl_vm::{CompileContext, CompileOutcome, Registry, Validation};
use tracing::trace;

use crate::error::CompileError;
use crate::lexer::{Lexer, Token};

/// An open composite.
struct Construct<'a> {
    lib: LibId,
    /// Index of its prolog in the output.
    start: usize,
    open: Token<'a>,
}

/// Offer `token` to each library in registration order. The winner's
/// library id and answer are returned; `None` when nobody claims it.
fn offer(
    registry: &Registry,
    token: &str,
    construct: Option<LibId>,
    out: &mut Vec<Word>,
) -> Option<(LibId, CompileOutcome)> {
    let start = out.len();
    for lib in registry.libraries() {
        let outcome = lib.compile(&mut CompileContext::new(token, construct, out));
        if outcome == CompileOutcome::NotMine {
            out.truncate(start);
            continue;
        }
        let id = lib.ids().first().copied()?;
        trace!(token, library = lib.name(), ?outcome, "token compiled");
        return Some((id, outcome));
    }
    None
}

/// Ask the innermost composite's library whether it takes the element that
/// was just completed at `out[start..]`.
fn validate(
    registry: &Registry,
    constructs: &[Construct<'_>],
    out: &[Word],
    start: usize,
    token: &Token<'_>,
) -> Result<(), CompileError> {
    let Some(construct) = constructs.last() else {
        return Ok(());
    };
    let verdict = match registry.get(construct.lib) {
        Some(lib) => lib.validate(out[construct.start], &out[start..]),
        None => Validation::Accept,
    };
    match verdict {
        Validation::Accept => Ok(()),
        Validation::Reject => Err(CompileError::Rejected {
            line: token.line,
            col: token.col,
            token: token.text.to_string(),
        }),
    }
}

fn patch_size(out: &mut [Word], start: usize, token: &Token<'_>) -> Result<(), CompileError> {
    let size = out.len() - start - 1;
    out[start] = out[start]
        .with_size(size)
        .map_err(|source| CompileError::Encoding {
            line: token.line,
            col: token.col,
            source,
        })?;
    Ok(())
}

/// Compile `text` into the cells of one program object.
pub(crate) fn parse(registry: &Registry, text: &str) -> Result<Vec<Word>, CompileError> {
    let mut out = vec![Word::prolog(LibId::PROGRAM, 0)];
    let mut constructs: Vec<Construct<'_>> = Vec::new();
    let mut last = Token {
        text: "",
        line: 1,
        col: 1,
    };

    for token in Lexer::new(registry, text) {
        last = token;
        let start = out.len();
        let construct = constructs.last().map(|c| c.lib);
        let Some((lib, outcome)) = offer(registry, token.text, construct, &mut out) else {
            return Err(CompileError::UnknownToken {
                line: token.line,
                col: token.col,
                token: token.text.to_string(),
            });
        };
        match outcome {
            CompileOutcome::NotMine | CompileOutcome::Emitted => {
                validate(registry, &constructs, &out, start, &token)?;
            }
            CompileOutcome::StartConstruct => {
                let lib = out.get(start).map_or(lib, |prolog| prolog.library());
                constructs.push(Construct {
                    lib,
                    start,
                    open: token,
                });
            }
            CompileOutcome::EndConstruct => {
                let Some(done) = constructs.pop() else {
                    return Err(CompileError::Syntax {
                        line: token.line,
                        col: token.col,
                        message: format!("'{}' closes nothing", token.text),
                    });
                };
                patch_size(&mut out, done.start, &token)?;
                validate(registry, &constructs, &out, done.start, &done.open)?;
            }
            CompileOutcome::Error(message) => {
                return Err(CompileError::Syntax {
                    line: token.line,
                    col: token.col,
                    message,
                });
            }
        }
    }

    if let Some(open) = constructs.last() {
        return Err(CompileError::Unterminated {
            line: open.open.line,
            col: open.open.col,
            token: open.open.text.to_string(),
        });
    }
    out.push(SEMI);
    patch_size(&mut out, 0, &last)?;
    Ok(out)
}
