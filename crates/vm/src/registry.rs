//! Library registry: library id to handler, in O(1).

use std::sync::Arc;

use rpl_common::{LibId, Word, MAX_LIBRARY};
use tracing::debug;

use crate::error::RplError;
use crate::library::{Library, ObjectCheck, ObjectInfo};

/// Direct-indexed table of registered libraries.
#[derive(Clone)]
pub struct Registry {
    table: Vec<Option<Arc<dyn Library>>>,
    /// Registration order; the compiler offers tokens in this order.
    order: Vec<Arc<dyn Library>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            table: vec![None; MAX_LIBRARY as usize + 1],
            order: Vec::new(),
        }
    }

    /// Register a handler under every id it claims. Fails without side
    /// effects if any id is reserved or taken.
    pub fn register(&mut self, lib: Arc<dyn Library>) -> Result<(), RplError> {
        for &id in lib.ids() {
            if id == LibId::RESERVED || id.0 > MAX_LIBRARY || self.table[id.0 as usize].is_some() {
                return Err(RplError::LibraryConflict(id));
            }
        }
        for &id in lib.ids() {
            self.table[id.0 as usize] = Some(lib.clone());
        }
        debug!(library = lib.name(), ids = ?lib.ids(), "library registered");
        self.order.push(lib);
        Ok(())
    }

    /// Unregister the handler owning `id` (and all its other ids).
    pub fn unregister(&mut self, id: LibId) -> Option<Arc<dyn Library>> {
        let lib = self.get(id)?.clone();
        for &owned in lib.ids() {
            self.table[owned.0 as usize] = None;
        }
        self.order.retain(|l| !Arc::ptr_eq(l, &lib));
        debug!(library = lib.name(), "library removed");
        Some(lib)
    }

    pub fn get(&self, id: LibId) -> Option<&Arc<dyn Library>> {
        self.table.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Handler for `id`, or `UnknownLibrary`.
    pub fn resolve(&self, id: LibId) -> Result<&Arc<dyn Library>, RplError> {
        self.get(id).ok_or(RplError::UnknownLibrary(id))
    }

    /// Libraries in registration order.
    pub fn libraries(&self) -> impl Iterator<Item = &Arc<dyn Library>> {
        self.order.iter()
    }

    /// Run the owning library's structural check on an object.
    pub fn check(&self, object: &[Word]) -> ObjectCheck {
        let Some(head) = object.first() else {
            return ObjectCheck::Invalid("empty object".to_string());
        };
        match self.get(head.library()) {
            Some(lib) => lib.check_object(object, self),
            None => ObjectCheck::Invalid(format!("no library {}", head.library())),
        }
    }

    /// Type information from the owning library.
    pub fn info(&self, object: &[Word]) -> Option<ObjectInfo> {
        let head = object.first()?;
        self.get(head.library())?.get_info(object)
    }
}
