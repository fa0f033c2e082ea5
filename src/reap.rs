use nix::unistd::Pid;
use tracing::trace;

use crate::error::Result;
use crate::global::State;
use crate::job::StatusEvent;
use crate::process::Backend;

/// Applies `event` to job `id` and tells the user about it. A clean exit of a job
/// that was waited on in the foreground is silent.
pub fn settle<B: Backend>(state: &mut State<B>, id: u32, pid: Pid, event: StatusEvent, foreground: bool) -> Result<()> {
	state.job_set.apply(id, event);
	match event {
		StatusEvent::Unchanged => Ok(()),
		StatusEvent::Exited(_) if foreground => Ok(()),
		StatusEvent::Exited(code) => state.report(format_args!("[{}] ({}) terminated with exit status {}\n", id, pid, code)),
		StatusEvent::Signaled(sig) => state.report(format_args!("[{}] ({}) terminated by signal {}\n", id, pid, sig)),
		StatusEvent::Stopped(sig) => state.report(format_args!("[{}] ({}) suspended by signal {}\n", id, pid, sig)),
		StatusEvent::Continued => state.report(format_args!("[{}] ({}) resumed\n", id, pid)),
	}
}

/// Polls every tracked job once without blocking.
pub fn reap<B: Backend>(state: &mut State<B>) -> Result<()> {
	for pid in state.job_set.tracked_pids() {
		let id = match state.job_set.job_id_of(pid) {
			Some(id) => id,
			None => continue,
		};
		let event = state.backend.wait_for_status_change(pid, true)?;
		if event != StatusEvent::Unchanged {
			trace!(id, %pid, ?event, "reaped");
		}
		settle(state, id, pid, event, false)?;
	}
	Ok(())
}
