//! The library dispatch protocol.
//!
//! Every command and every object type belongs to a library. The engine
//! knows nothing about integers, lists or strings: it reads a cell, takes
//! the library id out of it and hands the cell to that library's
//! [`Library::exec`]. The compiler, decompiler, `TYPE` and the integrity
//! checker reach libraries through the other methods of the trait, each of
//! which has a default meaning "not mine".

use rpl_common::object::payload;
use rpl_common::{LibId, ObjectType, Operator, Word};

use crate::error::RplError;
use crate::machine::Runtime;
use crate::registry::Registry;
use crate::rom::RomId;
use crate::store::ObjPtr;

/// Lexical category of a token or object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Text,
    Name,
    Operator,
    Command,
    /// Opens a composite (`«`, `{`, `[`).
    Open,
    /// Closes a composite.
    Close,
}

/// Answer to a token probe: how many bytes the library would consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub len: usize,
    pub kind: TokenKind,
}

/// Answer to a compile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Token not recognised; try the next library.
    NotMine,
    /// A complete object was emitted.
    Emitted,
    /// A composite prolog was emitted; elements follow until the matching close.
    StartConstruct,
    /// The innermost composite is complete.
    EndConstruct,
    /// The token belongs to this library but is malformed.
    Error(String),
}

/// State handed to [`Library::compile`].
pub struct CompileContext<'a> {
    token: &'a str,
    construct: Option<LibId>,
    out: &'a mut Vec<Word>,
}

impl<'a> CompileContext<'a> {
    pub fn new(token: &'a str, construct: Option<LibId>, out: &'a mut Vec<Word>) -> Self {
        Self {
            token,
            construct,
            out,
        }
    }

    pub fn token(&self) -> &'a str {
        self.token
    }

    /// Library of the innermost open composite, `None` at top level.
    pub fn construct(&self) -> Option<LibId> {
        self.construct
    }

    pub fn emit(&mut self, word: Word) {
        self.out.push(word);
    }

    pub fn emit_all(&mut self, words: &[Word]) {
        self.out.extend_from_slice(words);
    }
}

/// Answer to a validate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accept,
    Reject,
}

/// Answer to a check-object request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectCheck {
    Valid,
    Invalid(String),
}

impl ObjectCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, ObjectCheck::Valid)
    }
}

/// Answer to a get-info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub object_type: ObjectType,
    pub kind: TokenKind,
}

/// Output form of the decompiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompileMode {
    /// Human-readable.
    Display,
    /// Text that compiles back to the same object.
    Edit,
}

/// Text sink handed to [`Library::decompile`].
pub struct Decompiler<'a> {
    registry: &'a Registry,
    mode: DecompileMode,
    out: String,
}

impl<'a> Decompiler<'a> {
    pub fn new(registry: &'a Registry, mode: DecompileMode) -> Self {
        Self {
            registry,
            mode,
            out: String::new(),
        }
    }

    pub fn mode(&self) -> DecompileMode {
        self.mode
    }

    /// Append a token, separated from the previous one by a space.
    pub fn token(&mut self, text: &str) {
        if !self.out.is_empty() && !self.out.ends_with(' ') {
            self.out.push(' ');
        }
        self.out.push_str(text);
    }

    /// Decompile an embedded object through its own library.
    pub fn object(&mut self, object: &[Word]) -> Result<(), RplError> {
        let head = *object.first().ok_or(RplError::StackUnderflow)?;
        let lib = self.registry.resolve(head.library())?.clone();
        lib.decompile(object, self)
    }

    /// Decompile every element of a composite payload.
    pub fn elements(&mut self, payload: &[Word]) -> Result<(), RplError> {
        for element in rpl_common::object::objects(payload) {
            self.object(element?)?;
        }
        Ok(())
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// A command library.
///
/// Implementations are stateless; per-run state lives in the [`Runtime`]
/// they are handed.
pub trait Library: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Library numbers this handler answers for. The first is its primary id.
    fn ids(&self) -> &'static [LibId];

    /// Command names, indexed by command number. Empty names are commands
    /// that cannot be typed.
    fn commands(&self) -> &'static [&'static str] {
        &[]
    }

    /// Execute a command word, or a prolog met in the instruction stream.
    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError>;

    /// Apply an overloadable operator to operands on the data stack.
    fn operator(&self, _rt: &mut Runtime, _op: Operator) -> Result<(), RplError> {
        Err(RplError::BadArgumentType)
    }

    /// Compile one token.
    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        match self.ids().first() {
            Some(&lib) => compile_command(lib, self.commands(), cx),
            None => CompileOutcome::NotMine,
        }
    }

    /// Write the text form of an object owned by this library.
    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        decompile_command(self.commands(), object, out);
        Ok(())
    }

    /// Length of the token this library recognises at the start of `text`.
    fn probe_token(&self, _text: &str) -> Option<TokenInfo> {
        None
    }

    /// Accept or reject the last element compiled inside one of this
    /// library's composites. `construct` is the composite's prolog.
    fn validate(&self, _construct: Word, _last: &[Word]) -> Validation {
        Validation::Accept
    }

    /// Type information about an object.
    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        match object.first() {
            Some(w) if w.is_command() => Some(ObjectInfo {
                object_type: ObjectType::Command,
                kind: TokenKind::Command,
            }),
            _ => None,
        }
    }

    /// Constant objects installed as pinned ROM blocks, addressed by index.
    fn rom_objects(&self) -> &'static [&'static [Word]] {
        &[]
    }

    /// Stable id of a ROM object owned by this library.
    fn get_rom_id(&self, rt: &Runtime, ptr: ObjPtr) -> Option<RomId> {
        rt.rom_id(ptr).filter(|id| self.ids().contains(&id.lib))
    }

    /// Pointer to the ROM object with this id.
    fn rom_id_to_pointer(&self, rt: &Runtime, id: RomId) -> Result<ObjPtr, RplError> {
        rt.rom_pointer(id)
    }

    /// Structural check of an object owned by this library.
    fn check_object(&self, object: &[Word], _registry: &Registry) -> ObjectCheck {
        match object.first() {
            Some(w) if w.is_command() => {
                let known = self
                    .commands()
                    .get(w.command_index() as usize)
                    .is_some();
                if known {
                    ObjectCheck::Valid
                } else {
                    ObjectCheck::Invalid(format!("unknown command {}", w.command_index()))
                }
            }
            Some(_) => ObjectCheck::Valid,
            None => ObjectCheck::Invalid("empty object".to_string()),
        }
    }

    /// Text of a library-defined error code.
    fn message(&self, _code: u32) -> Option<&'static str> {
        None
    }

    /// Called once after registration.
    fn install(&self, _rt: &mut Runtime) -> Result<(), RplError> {
        Ok(())
    }

    /// Called before the library is unregistered.
    fn remove(&self, _rt: &mut Runtime) {}
}

/// Compile a token that names one of `commands`.
pub fn compile_command(
    lib: LibId,
    commands: &[&str],
    cx: &mut CompileContext<'_>,
) -> CompileOutcome {
    let token = cx.token();
    match commands.iter().position(|&name| !name.is_empty() && name == token) {
        Some(index) => {
            cx.emit(Word::command(lib, index as u32));
            CompileOutcome::Emitted
        }
        None => CompileOutcome::NotMine,
    }
}

/// Decompile a command word by name; prologs get a generic placeholder.
pub fn decompile_command(commands: &[&str], object: &[Word], out: &mut Decompiler<'_>) {
    let Some(&head) = object.first() else {
        return;
    };
    if head.is_command() {
        match commands.get(head.command_index() as usize) {
            Some(name) if !name.is_empty() => out.token(name),
            _ => out.token(&format!(
                "<cmd {}:{}>",
                head.library(),
                head.command_index()
            )),
        }
    } else {
        out.token(&format!(
            "<object {}:{} cells>",
            head.library(),
            payload(object).len()
        ));
    }
}

/// Built-in handler of opcodes in the instruction stream that belong to a
/// data library: a prolog pushes the object it heads.
pub fn push_self(rt: &mut Runtime, word: Word) -> Result<(), RplError> {
    if word.is_prolog() {
        rt.push_current()
    } else {
        Err(RplError::UnknownOpcode(word))
    }
}
