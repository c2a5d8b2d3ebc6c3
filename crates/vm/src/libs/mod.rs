//! Libraries the engine cannot run without: end-of-code and halt control,
//! and program objects.

pub mod program;
pub mod system;

use std::sync::Arc;

use crate::error::RplError;
use crate::machine::Runtime;

/// Register the built-in libraries into a fresh runtime.
pub(crate) fn install_builtins(rt: &mut Runtime) -> Result<(), RplError> {
    rt.install_library(Arc::new(system::SystemLibrary))?;
    rt.install_library(Arc::new(program::ProgramLibrary))?;
    Ok(())
}
