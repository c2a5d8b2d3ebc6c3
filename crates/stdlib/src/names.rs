//! Identifiers (libraries 20 and 21).
//!
//! A bare name met in a program recalls the local variable of that name.
//! A quoted name (`'x'`) is data and pushes itself; `EVAL` recalls it.

use rpl_common::object::{pack_text, unpack_text};
use rpl_common::{LibId, ObjectType, Operator, Word};
use rpl_vm::{
    CompileContext, CompileOutcome, Decompiler, Library, ObjPtr, ObjectCheck, ObjectInfo,
    Registry, RplError, Runtime, TokenInfo, TokenKind,
};

/// Libraries 20 (bare) and 21 (quoted).
pub struct NameLibrary;

/// Whether `text` is a valid identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Whether a cell heads a name object of either kind.
pub fn is_name(head: Word) -> bool {
    head.is_prolog() && matches!(head.library(), LibId::IDENT | LibId::QUOTED_IDENT)
}

/// Text of a name object.
pub fn name_of(object: &[Word]) -> Result<String, RplError> {
    match object.first() {
        Some(&head) if is_name(head) => Ok(unpack_text(object)?),
        _ => Err(RplError::BadArgumentType),
    }
}

/// LAM index of the binding for `name`, innermost first. With
/// `scan_parents` false only the innermost frame is searched.
pub fn lookup(rt: &Runtime, name: &str, scan_parents: bool) -> Result<Option<usize>, RplError> {
    for index in rt.lams().search_order(scan_parents) {
        let Some(entry) = rt.lams().get(index) else {
            continue;
        };
        if name_of(rt.object(entry.name)?)? == name {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Value bound to the name object at `ptr`.
pub fn recall(rt: &Runtime, ptr: ObjPtr) -> Result<ObjPtr, RplError> {
    let name = name_of(rt.object(ptr)?)?;
    lookup(rt, &name, true)?
        .and_then(|index| rt.lams().get(index))
        .map(|entry| entry.value)
        .ok_or(RplError::UndefinedName(name))
}

impl Library for NameLibrary {
    fn name(&self) -> &'static str {
        "names"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::IDENT, LibId::QUOTED_IDENT]
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if !word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        if word.library() == LibId::QUOTED_IDENT {
            return rt.push_current();
        }
        let current = rt.context().current.ok_or(RplError::StackUnderflow)?;
        let value = recall(rt, current)?;
        rt.data_mut().push(value)
    }

    fn operator(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        match op {
            Operator::Eval => {
                let value = recall(rt, rt.data().peek(1)?)?;
                rt.data_mut().overwrite(1, value)
            }
            _ => Err(RplError::BadArgumentType),
        }
    }

    fn probe_token(&self, text: &str) -> Option<TokenInfo> {
        let rest = text.strip_prefix('\'')?;
        let len = rest.find('\'').map_or(text.len(), |end| end + 2);
        Some(TokenInfo {
            len,
            kind: TokenKind::Name,
        })
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        let token = cx.token();
        let (lib, name) = match token.strip_prefix('\'') {
            Some(rest) => match rest.strip_suffix('\'') {
                Some(name) => (LibId::QUOTED_IDENT, name),
                None => return CompileOutcome::Error("unterminated quoted name".to_string()),
            },
            None => (LibId::IDENT, token),
        };
        if !is_identifier(name) {
            return match lib {
                LibId::QUOTED_IDENT => CompileOutcome::Error(format!("invalid name {token}")),
                _ => CompileOutcome::NotMine,
            };
        }
        match pack_text(lib, name) {
            Ok(words) => {
                cx.emit_all(&words);
                CompileOutcome::Emitted
            }
            Err(e) => CompileOutcome::Error(e.to_string()),
        }
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        let name = name_of(object)?;
        match object.first().map(|w| w.library()) {
            Some(LibId::QUOTED_IDENT) => out.token(&format!("'{name}'")),
            _ => out.token(&name),
        }
        Ok(())
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        object.first().filter(|w| w.is_prolog()).map(|_| ObjectInfo {
            object_type: ObjectType::Name,
            kind: TokenKind::Name,
        })
    }

    fn check_object(&self, object: &[Word], _registry: &Registry) -> ObjectCheck {
        match name_of(object) {
            Ok(name) if is_identifier(&name) => ObjectCheck::Valid,
            Ok(name) => ObjectCheck::Invalid(format!("invalid name {name:?}")),
            Err(e) => ObjectCheck::Invalid(e.to_string()),
        }
    }
}
