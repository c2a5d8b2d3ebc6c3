//! Lists (library 30): `{ 1 "two" « 3 » }`.
//!
//! Elements are stored inline. Taking a list apart pushes pointers into the
//! list's own block rather than copies.

use rpl_common::object::{objects, payload, unpack_text};
use rpl_common::{LibId, ObjectType, Operator, Word};
use rpl_vm::library::push_self;
use rpl_vm::{
    CompileContext, CompileOutcome, Decompiler, Library, ObjectCheck, ObjectInfo,
    Registry, RplError, Runtime, TokenInfo, TokenKind,
};

use crate::args::{compile_with_aliases, composite, element_pointers, push_integer, read_count};

static COMMANDS: [&str; 3] = ["→LIST", "LIST→", "SIZE"];

const TO_LIST: u32 = 0;
const FROM_LIST: u32 = 1;
const SIZE: u32 = 2;

/// Library 30.
pub struct ListLibrary;

/// Concatenated cells of the `n` objects just below level `above`, deepest
/// first.
pub fn gather(rt: &Runtime, n: usize, above: usize) -> Result<Vec<Word>, RplError> {
    let mut cells = Vec::new();
    for level in (above + 1..=above + n).rev() {
        cells.extend_from_slice(rt.peek_object(level)?);
    }
    Ok(cells)
}

fn is_list(rt: &Runtime, level: usize) -> Result<bool, RplError> {
    let head = rt.word_at(rt.data().peek(level)?)?;
    Ok(head.is_prolog() && head.library() == LibId::LIST)
}

/// Elements of a list, or the object itself when it is not a list.
fn contents(rt: &Runtime, level: usize) -> Result<Vec<Word>, RplError> {
    let object = rt.peek_object(level)?;
    if is_list(rt, level)? {
        Ok(payload(object).to_vec())
    } else {
        Ok(object.to_vec())
    }
}

fn to_list(rt: &mut Runtime) -> Result<(), RplError> {
    let n = read_count(rt, 1)?;
    if rt.data().depth() < n + 1 {
        return Err(RplError::StackUnderflow);
    }
    let cells = gather(rt, n, 1)?;
    let words = composite(LibId::LIST, &cells)?;
    rt.data_mut().pop_n(n + 1)?;
    rt.push_object(&words)
}

fn explode(rt: &mut Runtime) -> Result<(), RplError> {
    if !is_list(rt, 1)? {
        return Err(RplError::BadArgumentType);
    }
    let list = rt.data().peek(1)?;
    let elements = element_pointers(rt, list)?;
    rt.data_mut().pop()?;
    for ptr in &elements {
        rt.data_mut().push(*ptr)?;
    }
    push_integer(rt, elements.len() as i64)
}

fn size(rt: &mut Runtime) -> Result<(), RplError> {
    let object = rt.peek_object(1)?;
    let head = *object.first().ok_or(RplError::BadArgumentType)?;
    if !head.is_prolog() {
        return Err(RplError::BadArgumentType);
    }
    let n = match head.library() {
        LibId::LIST | LibId::VECTOR => objects(payload(object)).count(),
        LibId::STRING => unpack_text(object)?.chars().count(),
        _ => return Err(RplError::BadArgumentType),
    };
    rt.data_mut().pop()?;
    push_integer(rt, n as i64)
}

/// Shared `{ }` / `[ ]` compile logic.
pub fn compile_delimited(
    lib: LibId,
    open: &str,
    close: &str,
    cx: &mut CompileContext<'_>,
) -> Option<CompileOutcome> {
    let token = cx.token();
    if token == open {
        cx.emit(Word::prolog(lib, 0));
        return Some(CompileOutcome::StartConstruct);
    }
    if token == close {
        return Some(if cx.construct() == Some(lib) {
            CompileOutcome::EndConstruct
        } else {
            CompileOutcome::Error(format!("'{close}' without matching '{open}'"))
        });
    }
    None
}

/// Shared `{ }` / `[ ]` probe.
pub fn probe_delimiters(text: &str, open: &str, close: &str) -> Option<TokenInfo> {
    if text.starts_with(open) {
        Some(TokenInfo {
            len: open.len(),
            kind: TokenKind::Open,
        })
    } else if text.starts_with(close) {
        Some(TokenInfo {
            len: close.len(),
            kind: TokenKind::Close,
        })
    } else {
        None
    }
}

/// Check every element of a composite through its own library.
pub fn check_elements(object: &[Word], registry: &Registry) -> ObjectCheck {
    if object.first().map(|w| w.object_len()) != Some(object.len()) {
        return ObjectCheck::Invalid("size disagrees with storage".to_string());
    }
    for element in objects(payload(object)) {
        let check = match element {
            Ok(e) => registry.check(e),
            Err(e) => ObjectCheck::Invalid(e.to_string()),
        };
        if !check.is_valid() {
            return check;
        }
    }
    ObjectCheck::Valid
}

impl Library for ListLibrary {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::LIST]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return push_self(rt, word);
        }
        match word.command_index() {
            TO_LIST => to_list(rt),
            FROM_LIST => explode(rt),
            SIZE => size(rt),
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }

    /// `+` concatenates lists, or appends/prepends a single object.
    fn operator(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        if op != Operator::Add || !(is_list(rt, 1)? || is_list(rt, 2)?) {
            return Err(RplError::BadArgumentType);
        }
        let mut cells = contents(rt, 2)?;
        cells.extend(contents(rt, 1)?);
        let words = composite(LibId::LIST, &cells)?;
        rt.data_mut().pop_n(2)?;
        rt.push_object(&words)
    }

    fn probe_token(&self, text: &str) -> Option<TokenInfo> {
        probe_delimiters(text, "{", "}")
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        compile_delimited(LibId::LIST, "{", "}", cx).unwrap_or_else(|| {
            compile_with_aliases(
                LibId::LIST,
                &COMMANDS,
                &[("->LIST", TO_LIST), ("LIST->", FROM_LIST)],
                cx,
            )
        })
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        match object.first() {
            Some(w) if w.is_prolog() => {
                out.token("{");
                out.elements(payload(object))?;
                out.token("}");
            }
            _ => rpl_vm::library::decompile_command(&COMMANDS, object, out),
        }
        Ok(())
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        let head = object.first()?;
        Some(if head.is_prolog() {
            ObjectInfo {
                object_type: ObjectType::List,
                kind: TokenKind::Open,
            }
        } else {
            ObjectInfo {
                object_type: ObjectType::Command,
                kind: TokenKind::Command,
            }
        })
    }

    fn check_object(&self, object: &[Word], registry: &Registry) -> ObjectCheck {
        match object.first() {
            Some(w) if w.is_prolog() => check_elements(object, registry),
            Some(w) if (w.command_index() as usize) < COMMANDS.len() => ObjectCheck::Valid,
            Some(w) => ObjectCheck::Invalid(format!("unknown command {}", w.command_index())),
            None => ObjectCheck::Invalid("empty object".into()),
        }
    }
}
