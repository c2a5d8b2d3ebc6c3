//! Strings (library 24).

use rpl_common::object::{pack_text, unpack_text};
use rpl_common::{LibId, ObjectType, Operator, Word};
use rpl_vm::library::push_self;
use rpl_vm::{
    CompileContext, CompileOutcome, DecompileMode, Decompiler, Library, ObjectCheck, ObjectInfo,
    Registry, RplError, Runtime, TokenInfo, TokenKind,
};

use crate::args::compile_with_aliases;

static COMMANDS: [&str; 1] = ["→STR"];

const TO_STR: u32 = 0;

/// Library 24.
pub struct StringLibrary;

/// Text of a string object, or its display form for anything else.
fn text_of(rt: &Runtime, level: usize) -> Result<String, RplError> {
    let object = rt.peek_object(level)?;
    match object.first() {
        Some(w) if w.is_prolog() && w.library() == LibId::STRING => Ok(unpack_text(object)?),
        _ => display(rt.registry(), object),
    }
}

/// Display form of any object.
pub fn display(registry: &Registry, object: &[Word]) -> Result<String, RplError> {
    let mut out = Decompiler::new(registry, DecompileMode::Display);
    out.object(object)?;
    Ok(out.finish())
}

fn is_string(rt: &Runtime, level: usize) -> Result<bool, RplError> {
    Ok(rt.library_at(level)? == LibId::STRING)
}

impl Library for StringLibrary {
    fn name(&self) -> &'static str {
        "strings"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::STRING]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return push_self(rt, word);
        }
        match word.command_index() {
            TO_STR => {
                let text = text_of(rt, 1)?;
                let words = pack_text(LibId::STRING, &text)?;
                rt.data_mut().pop()?;
                rt.push_object(&words)
            }
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }

    /// `+` concatenates; a non-string operand contributes its display form.
    fn operator(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        match op {
            Operator::Add if is_string(rt, 1)? || is_string(rt, 2)? => {
                let joined = text_of(rt, 2)? + &text_of(rt, 1)?;
                let words = pack_text(LibId::STRING, &joined)?;
                rt.data_mut().pop_n(2)?;
                rt.push_object(&words)
            }
            _ => Err(RplError::BadArgumentType),
        }
    }

    fn probe_token(&self, text: &str) -> Option<TokenInfo> {
        let rest = text.strip_prefix('"')?;
        // An unterminated literal runs to the end of the text, where
        // compile reports it.
        let len = rest.find('"').map_or(text.len(), |end| end + 2);
        Some(TokenInfo {
            len,
            kind: TokenKind::Text,
        })
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        let Some(rest) = cx.token().strip_prefix('"') else {
            return compile_with_aliases(LibId::STRING, &COMMANDS, &[("->STR", TO_STR)], cx);
        };
        let Some(body) = rest.strip_suffix('"') else {
            return CompileOutcome::Error("unterminated string".to_string());
        };
        match pack_text(LibId::STRING, body) {
            Ok(words) => {
                cx.emit_all(&words);
                CompileOutcome::Emitted
            }
            Err(e) => CompileOutcome::Error(e.to_string()),
        }
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        match object.first() {
            Some(w) if w.is_prolog() => {
                out.token(&format!("\"{}\"", unpack_text(object)?));
                Ok(())
            }
            _ => {
                rpl_vm::library::decompile_command(&COMMANDS, object, out);
                Ok(())
            }
        }
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        let head = object.first()?;
        Some(if head.is_prolog() {
            ObjectInfo {
                object_type: ObjectType::String,
                kind: TokenKind::Text,
            }
        } else {
            ObjectInfo {
                object_type: ObjectType::Command,
                kind: TokenKind::Command,
            }
        })
    }

    fn check_object(&self, object: &[Word], _registry: &Registry) -> ObjectCheck {
        match object.first() {
            Some(w) if w.is_prolog() => match unpack_text(object) {
                Ok(_) => ObjectCheck::Valid,
                Err(e) => ObjectCheck::Invalid(e.to_string()),
            },
            Some(w) if (w.command_index() as usize) < COMMANDS.len() => ObjectCheck::Valid,
            Some(w) => ObjectCheck::Invalid(format!("unknown command {}", w.command_index())),
            None => ObjectCheck::Invalid("empty object".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_spans_the_quotes() {
        let lib = StringLibrary;
        assert_eq!(lib.probe_token("\"a b\" DUP").map(|t| t.len), Some(5));
        assert_eq!(lib.probe_token("\"open").map(|t| t.len), Some(5));
        assert_eq!(lib.probe_token("DUP"), None);
    }

    #[test]
    fn unterminated_literal_is_an_error() {
        let lib = StringLibrary;
        let mut out = Vec::new();
        let mut cx = CompileContext::new("\"open", None, &mut out);
        assert!(matches!(lib.compile(&mut cx), CompileOutcome::Error(_)));
    }
}
