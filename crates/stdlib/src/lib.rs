//! Standard command libraries for the RPL engine.
//!
//! The engine only knows programs and end-of-code. Everything a user types
//! beyond that lives here, one [`Library`](rpl_vm::Library) per concern:
//!
//! | id | library |
//! |----|---------|
//! | 4  | overloadable operators |
//! | 8  | flow control and error traps |
//! | 9  | stack manipulation |
//! | 10 | integers |
//! | 12 | reals |
//! | 20, 21 | bare and quoted names |
//! | 22 | local variables |
//! | 24 | strings |
//! | 30 | lists |
//! | 31 | numeric vectors |
//! | 40 | system commands |

pub mod args;
pub mod flow;
pub mod integers;
pub mod lists;
pub mod locals;
pub mod names;
pub mod operators;
pub mod reals;
pub mod stack;
pub mod strings;
pub mod system;
pub mod vectors;

use std::sync::Arc;

use rpl_vm::{Library, RplError, Runtime};
use tracing::debug;

/// Every library in this crate, in compile priority order. Names come last
/// so that command names win over identifiers.
pub fn libraries() -> Vec<Arc<dyn Library>> {
    vec![
        Arc::new(operators::OperatorLibrary),
        Arc::new(flow::FlowLibrary),
        Arc::new(stack::StackLibrary),
        Arc::new(integers::IntegerLibrary),
        Arc::new(reals::RealLibrary),
        Arc::new(locals::LocalsLibrary),
        Arc::new(strings::StringLibrary),
        Arc::new(lists::ListLibrary),
        Arc::new(vectors::VectorLibrary),
        Arc::new(system::SysCmdLibrary),
        Arc::new(names::NameLibrary),
    ]
}

/// Install every standard library into `rt`.
pub fn install_all(rt: &mut Runtime) -> Result<(), RplError> {
    for lib in libraries() {
        debug!(library = lib.name(), "installing library");
        rt.install_library(lib)?;
    }
    Ok(())
}
