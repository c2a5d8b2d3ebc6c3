//! Main execution loop, exception processing and the halt/resume state machine.

use std::mem;

use rpl_common::{LibId, Operator, Word};
use tracing::{debug, trace};

use crate::context::{EntryMarks, Exceptions, HaltFlags, HaltRecord};
use crate::error::{RplError, RunError};
use crate::libs::system::END_OF_CODE;
use crate::machine::{EngineState, Runtime};
use crate::roots::RootSlot;
use crate::stack::{Frame, FrameKind};
use crate::store::ObjPtr;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The entry program returned to its end-of-code marker.
    Completed,
    /// Execution stopped at `ip` and can be resumed.
    Halted {
        ip: ObjPtr,
        /// Error that froze the program, `None` for an explicit HALT.
        cause: Option<RplError>,
    },
    /// EXITRPL was executed.
    CleanExit,
}

impl Runtime {
    // ---- Entry points ----

    /// Make `object` the entry point of the next run. Programs are entered
    /// directly; any other object runs from a stub `[object, ENDOFCODE]`.
    pub fn install(&mut self, object: ObjPtr) -> Result<(), RplError> {
        let head = self.word_at(object)?;
        self.roots.set(RootSlot::Entry, object);
        let base_rs = self.rstack.depth();
        let lam = self.lams.mark();

        if head.is_prolog() && head.library() == LibId::PROGRAM {
            self.rstack.push(Frame::call(self.end_of_code))?;
            self.ctx.ip = Some(object.advance(1));
        } else {
            let mut stub = self.object(object)?.to_vec();
            stub.push(END_OF_CODE);
            self.ctx.ip = Some(self.store_object(&stub)?);
        }
        self.begin(EntryMarks {
            base_rs,
            entry_rs: self.rstack.depth(),
            lam,
        });
        debug!(?object, "program installed");
        Ok(())
    }

    /// Make a single opcode the entry point of the next run.
    pub fn install_opcode(&mut self, word: Word) -> Result<(), RplError> {
        let base_rs = self.rstack.depth();
        let lam = self.lams.mark();
        let stub = self.store_object(&[word, END_OF_CODE])?;
        self.roots.set(RootSlot::Entry, stub);
        self.ctx.ip = Some(stub);
        self.begin(EntryMarks {
            base_rs,
            entry_rs: base_rs,
            lam,
        });
        Ok(())
    }

    fn begin(&mut self, entry: EntryMarks) {
        self.ctx.entry = entry;
        self.ctx.current = None;
        self.ctx.blame = None;
        self.ctx.exception = Default::default();
        self.ctx.traps.clear();
    }

    /// Run a command the way the interactive environment does: record an
    /// undo level, then execute the opcode. For EVAL the evaluated object is
    /// blamed for errors rather than the stub that invoked it.
    pub fn run_command(&mut self, word: Word) -> Result<ExecutionOutcome, RunError> {
        self.prepare_undo();
        self.install_opcode(word)?;
        if word == Operator::Eval.word() {
            self.ctx.blame = self.data.peek(1).ok();
        }
        self.run()
    }

    /// Run the installed program until it completes, halts or fails.
    pub fn run(&mut self) -> Result<ExecutionOutcome, RunError> {
        if self.ctx.ip.is_none() {
            return Err(RunError::NothingToRun);
        }
        self.state = EngineState::Running;
        self.dispatch();
        self.finish()
    }

    /// Continue the most recently halted program.
    pub fn resume(&mut self) -> Result<ExecutionOutcome, RunError> {
        let record = self.halts.pop().ok_or(RunError::NotHalted)?;
        self.sync_halt_state();
        debug!(ip = ?record.ip, "resuming halted program");
        self.ctx.ip = Some(record.ip);
        self.ctx.entry = record.entry;
        self.ctx.traps = record.traps;
        self.ctx.current = None;
        self.ctx.exception = Default::default();
        self.run()
    }

    /// Discard the most recently halted program and unwind what it left on
    /// the return and local stacks.
    pub fn kill(&mut self) -> Result<(), RunError> {
        let record = self.halts.pop().ok_or(RunError::NotHalted)?;
        self.rstack.truncate(record.entry.base_rs);
        self.lams.truncate(record.entry.lam);
        self.sync_halt_state();
        debug!(ip = ?record.ip, "halted program killed");
        Ok(())
    }

    // ---- Signals raised by handlers ----

    /// Raise signal flags from a handler (HALT, EXITRPL, ...).
    pub fn raise(&mut self, flags: Exceptions) {
        self.ctx.exception.flags |= flags;
        if self.ctx.exception.at.is_none() {
            self.ctx.exception.at = self.ctx.current;
        }
    }

    fn raise_error(&mut self, error: RplError) {
        self.ctx.exception.error = Some(error);
        self.raise(Exceptions::ERROR);
    }

    // ---- The loop ----

    /// Fetch, dispatch, repeat until an exception is left unhandled.
    pub(crate) fn dispatch(&mut self) {
        loop {
            if self.interrupt.take() {
                self.raise_error(RplError::Interrupted);
            } else if let Err(e) = self.step() {
                self.raise_error(e);
            }
            if self.ctx.exception.is_clear() {
                continue;
            }
            if self.ctx.exception.flags == Exceptions::ERROR && self.enter_trap() {
                continue;
            }
            return;
        }
    }

    fn step(&mut self) -> Result<(), RplError> {
        let ip = self.ctx.ip.ok_or(RplError::EmptyReturnStack)?;
        let word = self.store.word_at(ip)?;
        let len = self.store.object(ip)?.len();
        self.ctx.current = Some(ip);
        self.ctx.ip = Some(ip.advance(len));
        let lib = self
            .registry
            .resolve(word.library())
            .map_err(|_| RplError::UnknownOpcode(word))?
            .clone();
        trace!(?word, library = lib.name(), "dispatch");
        lib.exec(self, word)
    }

    /// Hand a pending error to the innermost trap installed by this run.
    fn enter_trap(&mut self) -> bool {
        let belongs_to_run = self
            .ctx
            .traps
            .last()
            .is_some_and(|t| t.rs_depth >= self.ctx.entry.base_rs);
        if !belongs_to_run {
            return false;
        }
        let Some(trap) = self.ctx.traps.pop() else {
            return false;
        };
        let exception = mem::take(&mut self.ctx.exception);
        debug!(error = ?exception.error, "error trapped");
        self.rstack.truncate(trap.rs_depth);
        self.lams.truncate(trap.lam);
        self.ctx.last_error = exception.error;
        self.ctx.ip = Some(trap.resume);
        if let Err(e) = self.call_program(trap.handler, FrameKind::Call) {
            self.raise_error(e);
            return false;
        }
        true
    }

    /// Interpret the exception that stopped the loop.
    fn finish(&mut self) -> Result<ExecutionOutcome, RunError> {
        let exception = mem::take(&mut self.ctx.exception);
        let entry = self.ctx.entry;
        let depth = self.rstack.depth();

        if exception.flags.contains(Exceptions::EXIT_RPL) {
            self.rstack.clear();
            self.lams.clear();
            self.halts.clear();
            self.ctx.traps.clear();
            self.halt_flags = HaltFlags::empty();
            self.end_run();
            self.state = EngineState::CleanExit;
            debug!("clean exit");
            return Ok(ExecutionOutcome::CleanExit);
        }

        if depth < entry.base_rs {
            self.rstack.truncate(0);
            self.lams.truncate(entry.lam);
            self.halts.clear();
            self.ctx.traps.clear();
            self.end_run();
            self.sync_halt_state();
            return Err(RunError::ReturnStackCorrupted);
        }

        if exception.flags.contains(Exceptions::ERROR) {
            let error = exception.error.unwrap_or(RplError::Interrupted);
            if depth <= entry.entry_rs {
                self.rstack.truncate(entry.base_rs);
                self.lams.truncate(entry.lam);
                self.ctx.traps.clear();
                let blame = self.ctx.blame.take();
                self.end_run();
                self.sync_halt_state();
                debug!(%error, "run aborted");
                return Err(RunError::Aborted {
                    error,
                    at: exception.at,
                    blame,
                });
            }
            // Frames the failing handler pushed stay live; resume continues after it.
            let ip = self.ctx.ip.or(exception.at).ok_or(RunError::NothingToRun)?;
            return Ok(self.freeze(ip, Some(error), exception.flags));
        }

        let at_end = exception.flags == Exceptions::BREAKPOINT
            && depth == entry.base_rs
            && self.ctx.current.map(|c| self.store.word_at(c)) == Some(Ok(END_OF_CODE));
        if at_end {
            self.lams.truncate(entry.lam);
            self.ctx.traps.clear();
            self.end_run();
            self.sync_halt_state();
            return Ok(ExecutionOutcome::Completed);
        }

        let ip = self.ctx.ip.ok_or(RunError::NothingToRun)?;
        Ok(self.freeze(ip, None, exception.flags))
    }

    fn freeze(&mut self, ip: ObjPtr, cause: Option<RplError>, flags: Exceptions) -> ExecutionOutcome {
        debug!(?ip, ?cause, "program halted");
        self.halts.push(HaltRecord {
            ip,
            entry: self.ctx.entry,
            cause: cause.clone(),
            traps: mem::take(&mut self.ctx.traps),
        });
        self.halt_flags |= HaltFlags::from_exceptions(flags & Exceptions::OUTCOME);
        self.end_run();
        self.sync_halt_state();
        ExecutionOutcome::Halted { ip, cause }
    }

    fn end_run(&mut self) {
        self.ctx.ip = None;
        self.ctx.current = None;
        self.ctx.blame = None;
        self.roots.take(RootSlot::Entry);
    }

    fn sync_halt_state(&mut self) {
        match self.halts.last() {
            Some(h) => {
                self.halt_flags |= HaltFlags::HALTED;
                self.state = EngineState::Halted(h.ip);
            }
            None => {
                self.halt_flags.remove(HaltFlags::HALTED);
                self.state = EngineState::Idle;
            }
        }
    }

    // ---- Calls ----

    /// Enter a program object: push a return frame of `kind` and continue at
    /// the program's first element.
    pub fn call_program(&mut self, program: ObjPtr, kind: FrameKind) -> Result<(), RplError> {
        let head = self.word_at(program)?;
        if !(head.is_prolog() && head.library() == LibId::PROGRAM) {
            return Err(RplError::BadArgumentType);
        }
        let ret = self.ctx.ip.ok_or(RplError::EmptyReturnStack)?;
        self.rstack.push(Frame { ip: ret, kind })?;
        self.ctx.ip = Some(program.advance(1));
        Ok(())
    }

    /// Return from the innermost frame, undoing what its kind implies.
    pub fn return_from_frame(&mut self) -> Result<(), RplError> {
        let top = self.rstack.top().copied().ok_or(RplError::EmptyReturnStack)?;
        if top.kind == FrameKind::Saved || self.rstack.depth() <= self.ctx.entry.base_rs {
            return Err(RplError::EmptyReturnStack);
        }
        self.rstack.pop()?;
        match top.kind {
            FrameKind::LocalScope => self.lams.close_frame(),
            FrameKind::ErrorTrap => {
                self.ctx.traps.pop();
            }
            FrameKind::Call | FrameKind::Saved => {}
        }
        self.ctx.ip = Some(top.ip);
        Ok(())
    }

    /// Evaluate an object: commands execute, programs are called, other
    /// objects ask their library for EVAL and are left on the stack if it
    /// has none.
    pub fn evaluate(&mut self, ptr: ObjPtr) -> Result<(), RplError> {
        let word = self.word_at(ptr)?;
        let lib = self.library_of(ptr)?;
        if word.is_command() {
            return lib.exec(self, word);
        }
        self.data.push(ptr)?;
        match lib.operator(self, Operator::Eval) {
            Err(RplError::BadArgumentType) => Ok(()),
            other => other,
        }
    }
}
