//! Program objects (secondaries): `« ... »`.
//!
//! A program stores its elements inline and ends with SEMI. Met in the
//! instruction stream a program is data and pushes itself; EVAL enters it.

use rpl_common::object::{objects, payload};
use rpl_common::{LibId, ObjectType, Operator, Word};

use crate::error::RplError;
use crate::library::{
    push_self, CompileContext, CompileOutcome, Decompiler, Library, ObjectCheck, ObjectInfo,
    TokenInfo, TokenKind,
};
use crate::machine::Runtime;
use crate::registry::Registry;
use crate::stack::FrameKind;

/// Return from the current program.
pub const SEMI: Word = Word::command(LibId::PROGRAM, 0);

static COMMANDS: [&str; 1] = [""];

const OPEN: [&str; 2] = ["«", "<<"];
const CLOSE: [&str; 2] = ["»", ">>"];

/// Library 2.
pub struct ProgramLibrary;

impl Library for ProgramLibrary {
    fn name(&self) -> &'static str {
        "program"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::PROGRAM]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word == SEMI {
            return rt.return_from_frame();
        }
        push_self(rt, word)
    }

    fn operator(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        match op {
            Operator::Eval => {
                let program = rt.data().peek(1)?;
                if !rt.word_at(program)?.is_prolog() {
                    return Err(RplError::BadArgumentType);
                }
                rt.data_mut().pop()?;
                rt.call_program(program, FrameKind::Call)
            }
            _ => Err(RplError::BadArgumentType),
        }
    }

    fn probe_token(&self, text: &str) -> Option<TokenInfo> {
        OPEN.iter()
            .map(|t| (t, TokenKind::Open))
            .chain(CLOSE.iter().map(|t| (t, TokenKind::Close)))
            .find(|(t, _)| text.starts_with(**t))
            .map(|(t, kind)| TokenInfo { len: t.len(), kind })
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        let token = cx.token();
        if OPEN.contains(&token) {
            cx.emit(Word::prolog(LibId::PROGRAM, 0));
            return CompileOutcome::StartConstruct;
        }
        if CLOSE.contains(&token) {
            if cx.construct() != Some(LibId::PROGRAM) {
                return CompileOutcome::Error(format!("'{token}' without matching «"));
            }
            cx.emit(SEMI);
            return CompileOutcome::EndConstruct;
        }
        CompileOutcome::NotMine
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        if object.first() == Some(&SEMI) {
            out.token("»");
            return Ok(());
        }
        out.token("«");
        let body = payload(object);
        let body = match body.last() {
            Some(&last) if last == SEMI => &body[..body.len() - 1],
            _ => body,
        };
        out.elements(body)?;
        out.token("»");
        Ok(())
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        match object.first() {
            Some(w) if w.is_prolog() => Some(ObjectInfo {
                object_type: ObjectType::Program,
                kind: TokenKind::Open,
            }),
            Some(_) => Some(ObjectInfo {
                object_type: ObjectType::Command,
                kind: TokenKind::Close,
            }),
            None => None,
        }
    }

    fn check_object(&self, object: &[Word], registry: &Registry) -> ObjectCheck {
        let Some(head) = object.first() else {
            return ObjectCheck::Invalid("empty object".to_string());
        };
        if head.is_command() {
            return if *head == SEMI {
                ObjectCheck::Valid
            } else {
                ObjectCheck::Invalid(format!("unknown command {}", head.command_index()))
            };
        }
        if object.len() != head.object_len() {
            return ObjectCheck::Invalid("size disagrees with storage".to_string());
        }
        let body = payload(object);
        if body.last() != Some(&SEMI) {
            return ObjectCheck::Invalid("program does not end with »".to_string());
        }
        for element in objects(body) {
            let element = match element {
                Ok(e) => e,
                Err(e) => return ObjectCheck::Invalid(e.to_string()),
            };
            let check = registry.check(element);
            if !check.is_valid() {
                return check;
            }
        }
        ObjectCheck::Valid
    }
}
