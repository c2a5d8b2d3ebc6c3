//! Transparent (sandboxed) execution of a single opcode.
//!
//! A handler or the host can run another command as if it were a pure
//! function of the top `nargs` stack levels: whatever the command does to
//! the stack below its arguments, to the return and local stacks or to the
//! exception state is undone, and only its top `nresults` results survive.

use std::mem;

use rpl_common::Word;
use tracing::debug;

use crate::context::{EntryMarks, Exceptions};
use crate::error::RplError;
use crate::libs::system::END_OF_CODE;
use crate::machine::Runtime;
use crate::stack::{Frame, FrameKind};

impl Runtime {
    /// Run `word` against the top `nargs` levels and replace them with at
    /// most `nresults` of its results. Returns the number of results pushed.
    ///
    /// If the command stops on anything but its end-of-code marker, all it
    /// produced is discarded and the arguments are still consumed: the stack
    /// is left `nargs` levels shallower than before. An error is reported
    /// through the returned `Err`; a halt or exit request yields `Ok(0)`.
    /// Either way the caller's exception state is untouched.
    pub fn run_transparent(
        &mut self,
        word: Word,
        nargs: usize,
        nresults: usize,
    ) -> Result<usize, RplError> {
        if self.data.depth() < nargs {
            return Err(RplError::BadArgumentCount);
        }
        let stub = match self.store_object(&[word, END_OF_CODE]) {
            Ok(stub) => stub,
            Err(e) => {
                self.data.pop_n(nargs)?;
                return Err(e);
            }
        };

        // Park the caller's state. The caller's ip goes on the return stack so
        // that it stays rooted while the command allocates.
        let saved_exception = mem::take(&mut self.ctx.exception);
        let saved_traps = mem::take(&mut self.ctx.traps);
        let saved_entry = self.ctx.entry;
        let saved_blame = self.ctx.blame.take();
        let saved_current = self.ctx.current.take();
        let saved_ip = self.ctx.ip;
        if let Some(ip) = saved_ip {
            if let Err(e) = self.rstack.push(Frame {
                ip,
                kind: FrameKind::Saved,
            }) {
                self.ctx.exception = saved_exception;
                self.ctx.traps = saved_traps;
                self.ctx.blame = saved_blame;
                self.ctx.current = saved_current;
                return Err(e);
            }
        }

        self.snapshots.take_keeping(&mut self.data, nargs);
        let rs_mark = self.rstack.depth();
        let lam_mark = self.lams.mark();
        self.ctx.entry = EntryMarks {
            base_rs: rs_mark,
            entry_rs: rs_mark,
            lam: lam_mark,
        };
        self.ctx.ip = Some(stub);

        self.dispatch();

        let exception = mem::take(&mut self.ctx.exception);
        let completed = exception.flags == Exceptions::BREAKPOINT
            && self.rstack.depth() == rs_mark;
        if !completed {
            self.data.clear();
        }

        self.rstack.truncate(rs_mark);
        self.lams.truncate(lam_mark);
        self.data.keep_top(nresults);

        // Results become snapshot 1, the pre-run stack is snapshot 2.
        self.snapshots.take_and_clear(&mut self.data);
        self.snapshots.revert_to(2, &mut self.data)?;
        self.data.pop_n(nargs)?;
        let produced = self.snapshots.depth_of(1)?;
        for index in (1..=produced).rev() {
            let ptr = self.snapshots.peek(1, index)?;
            self.data.push(ptr)?;
        }
        self.snapshots.remove(1);

        self.ctx.exception = saved_exception;
        self.ctx.traps = saved_traps;
        self.ctx.entry = saved_entry;
        self.ctx.blame = saved_blame;
        self.ctx.current = saved_current;
        if saved_ip.is_some() {
            self.rstack.pop()?;
        }
        self.ctx.ip = saved_ip;

        debug!(?word, nargs, produced, completed, "transparent run finished");
        match exception.error {
            Some(error) if !completed => Err(error),
            _ => Ok(produced),
        }
    }
}
