//! Stack pass.
//!
//! Stack depths stay within the configured limits, LAM frame bases are in
//! order, and every set of entry marks (the current run's and each halted
//! program's) fits the return stack as it is now.

use rpl_vm::context::EntryMarks;
use rpl_vm::Runtime;

use crate::error::IntegrityError;

fn check_depth(stack: &'static str, depth: usize, limit: usize) -> Option<IntegrityError> {
    (depth > limit).then_some(IntegrityError::DepthExceeded {
        stack,
        depth,
        limit,
    })
}

fn check_marks(owner: String, marks: &EntryMarks, depth: usize) -> Option<IntegrityError> {
    let fits = marks.base_rs <= marks.entry_rs && marks.entry_rs <= depth;
    (!fits).then_some(IntegrityError::BadEntryMarks {
        owner,
        base_rs: marks.base_rs,
        entry_rs: marks.entry_rs,
        depth,
    })
}

/// Run the stack pass.
pub fn check_stacks(rt: &Runtime) -> Vec<IntegrityError> {
    let config = rt.config();
    let rs_depth = rt.return_stack().depth();
    let lams = rt.lams();
    let mut errors = Vec::new();

    errors.extend(check_depth("data", rt.data().depth(), config.data_depth));
    errors.extend(check_depth("return", rs_depth, config.return_depth));
    errors.extend(check_depth("LAM", lams.entries().len(), config.lam_depth));

    let mut floor = 0;
    for (frame, &base) in lams.bases().iter().enumerate() {
        if base < floor || base > lams.entries().len() {
            errors.push(IntegrityError::BadLamFrame { frame, base });
        }
        floor = base;
    }

    // Marks of a finished run are left behind; only a live entry point counts.
    let ctx = rt.context();
    if ctx.ip.is_some() {
        errors.extend(check_marks("current run".to_string(), &ctx.entry, rs_depth));
    }
    for (index, trap) in ctx.traps.iter().enumerate() {
        if trap.rs_depth > rs_depth {
            errors.push(IntegrityError::BadTrapDepth {
                index,
                rs_depth: trap.rs_depth,
                depth: rs_depth,
            });
        }
    }

    for (i, halt) in rt.halts().iter().enumerate() {
        errors.extend(check_marks(format!("halted program {i}"), &halt.entry, rs_depth));
        for (index, trap) in halt.traps.iter().enumerate() {
            if trap.rs_depth > rs_depth {
                errors.push(IntegrityError::BadTrapDepth {
                    index,
                    rs_depth: trap.rs_depth,
                    depth: rs_depth,
                });
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_common::{LibId, Word};
    use rpl_vm::libs::program::SEMI;
    use rpl_vm::libs::system::HALT;
    use rpl_vm::stack::{LamEntry, LamMark};
    use rpl_vm::{ExecutionOutcome, RuntimeConfig};

    fn halted() -> Runtime {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let program = rt
            .store_object(&[Word::prolog(LibId::PROGRAM, 2), HALT, SEMI])
            .unwrap();
        rt.install(program).unwrap();
        assert!(matches!(rt.run().unwrap(), ExecutionOutcome::Halted { .. }));
        rt
    }

    #[test]
    fn fresh_runtime_passes() {
        let rt = Runtime::new(RuntimeConfig::default()).unwrap();
        assert!(check_stacks(&rt).is_empty());
    }

    #[test]
    fn halted_program_passes() {
        let rt = halted();
        assert_eq!(rt.halts().len(), 1);
        assert!(check_stacks(&rt).is_empty());
    }

    #[test]
    fn halt_marks_above_the_return_stack_are_reported() {
        let mut rt = halted();
        rt.return_stack_mut().clear();
        let errors = check_stacks(&rt);
        assert_eq!(
            errors,
            vec![IntegrityError::BadEntryMarks {
                owner: "halted program 0".to_string(),
                base_rs: 0,
                entry_rs: 1,
                depth: 0,
            }]
        );
    }

    #[test]
    fn frame_base_past_the_entries_is_reported() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let name = rt.end_of_code();
        for _ in 0..2 {
            rt.lams_mut().push(LamEntry { name, value: name }).unwrap();
        }
        rt.lams_mut().open_frame();
        rt.lams_mut().truncate(LamMark {
            entries: 0,
            frames: 2,
        });
        let errors = check_stacks(&rt);
        assert_eq!(errors, vec![IntegrityError::BadLamFrame { frame: 1, base: 2 }]);
    }

    #[test]
    fn depth_over_limit_is_reported() {
        assert_eq!(check_depth("data", 3, 3), None);
        assert_eq!(
            check_depth("data", 4, 3),
            Some(IntegrityError::DepthExceeded {
                stack: "data",
                depth: 4,
                limit: 3,
            })
        );
    }
}
