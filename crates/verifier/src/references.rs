//! Reference pass.
//!
//! Every pointer the runtime holds (stack levels, LAM bindings, snapshots,
//! roots, ROM entries and execution registers) must name a live block and
//! an offset holding a whole object.

use rpl_vm::Runtime;

use crate::error::IntegrityError;

/// Run the reference pass.
pub fn check_references(rt: &Runtime) -> Vec<IntegrityError> {
    rt.references()
        .into_iter()
        .filter_map(|(origin, ptr)| match rt.store().object(ptr) {
            Ok(_) => None,
            Err(reason) => Some(IntegrityError::DanglingReference { origin, reason }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_common::object::pack_i64;
    use rpl_common::LibId;
    use rpl_vm::{ObjPtr, RefOrigin, RplError, RuntimeConfig};

    #[test]
    fn fresh_runtime_has_no_dangling_references() {
        let rt = Runtime::new(RuntimeConfig::default()).unwrap();
        assert!(check_references(&rt).is_empty());
    }

    #[test]
    fn reclaimed_block_on_the_stack_is_reported() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let ptr = rt.store_object(&pack_i64(LibId::INTEGER, 5)).unwrap();
        rt.compact();
        rt.data_mut().push(ptr).unwrap();
        let errors = check_references(&rt);
        assert_eq!(
            errors,
            vec![IntegrityError::DanglingReference {
                origin: RefOrigin::DataStack(1),
                reason: RplError::StaleReference,
            }]
        );
    }

    #[test]
    fn offset_past_the_block_is_reported() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let ptr = rt.store_object(&pack_i64(LibId::INTEGER, 5)).unwrap();
        rt.data_mut().push(ptr).unwrap();
        rt.data_mut().push(ptr.advance(3)).unwrap();
        let errors = check_references(&rt);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            IntegrityError::DanglingReference {
                origin: RefOrigin::DataStack(1),
                ..
            }
        ));
    }

    #[test]
    fn valid_pointer_passes() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let ptr = rt.store_object(&pack_i64(LibId::INTEGER, 5)).unwrap();
        rt.data_mut().push(ptr).unwrap();
        rt.data_mut().push(ObjPtr::block(ptr.handle)).unwrap();
        assert!(check_references(&rt).is_empty());
    }
}
