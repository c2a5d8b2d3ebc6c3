//! RPL execution engine.
//!
//! The engine runs RPL objects stored in a relocatable arena:
//! - An object store of generation-checked blocks, compacted on demand
//! - A data stack, a return stack and a stack of local (LAM) bindings
//! - A registry of libraries that own every command and object type
//! - A dispatch loop with halt/resume, error traps and transparent runs
//! - A snapshot ring backing interactive undo
//!
//! # Usage
//!
//! ```
//! use rpl_vm::libs::system::HALT;
//! use rpl_vm::{ExecutionOutcome, Runtime, RuntimeConfig};
//!
//! let mut rt = Runtime::new(RuntimeConfig::default())?;
//! rt.install_opcode(HALT)?;
//! assert!(matches!(rt.run()?, ExecutionOutcome::Halted { cause: None, .. }));
//! assert_eq!(rt.resume()?, ExecutionOutcome::Completed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod context;
pub mod error;
pub mod execute;
pub mod library;
pub mod libs;
pub mod machine;
pub mod registry;
pub mod rom;
pub mod roots;
pub mod snapshot;
pub mod stack;
pub mod store;
pub mod transparent;
pub mod undo;

pub use context::{Exceptions, HaltFlags, SystemFlags};
pub use error::{ArithmeticFault, RplError, RunError};
pub use execute::ExecutionOutcome;
pub use library::{
    CompileContext, CompileOutcome, DecompileMode, Decompiler, Library, ObjectCheck, ObjectInfo,
    TokenInfo, TokenKind, Validation,
};
pub use machine::{EngineState, InterruptHandle, RefOrigin, Runtime, RuntimeConfig};
pub use registry::Registry;
pub use rom::{RomEntry, RomId};
pub use roots::RootSlot;
pub use store::{Handle, ObjPtr};
