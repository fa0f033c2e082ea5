use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;
use crate::global::State;
use crate::job::{JobState, StatusEvent};
use crate::process::{Backend, LaunchSpec};
use crate::search::SearchCache;
use crate::types::Line;

/// Final path component, which is what the program sees as its argument 0.
fn display_argv0(name: &[u8]) -> &[u8] {
	match name.iter().rposition(|&c| c == b'/') {
		Some(i) => &name[i + 1 ..],
		None => name,
	}
}

fn resolve_program(search_cache: &mut SearchCache, name: &[u8]) -> PathBuf {
	let name = OsStr::from_bytes(name);
	if name.as_bytes().contains(&b'/') {
		return PathBuf::from(name);
	}
	search_cache.lookup_or_rehash(name).unwrap_or_else(|| PathBuf::from(name))
}

/// Starts the line's program. Background jobs are registered right away; a
/// foreground job is waited for and only registered if it stops.
pub fn launch<B: Backend>(state: &mut State<B>, line: &Line) -> Result<()> {
	let name = line.command.name();
	let program = resolve_program(&mut state.search_cache, name);
	let mut arguments = line.command.arguments.clone();
	arguments[0] = display_argv0(name);

	let pid = state.backend.launch(&LaunchSpec {
		program: &program,
		arguments: &arguments,
		redirects: &line.redirects,
		foreground: !line.is_background,
	})?;
	let display_name = String::from_utf8_lossy(name);

	if line.is_background {
		let id = state.next_job_id();
		state.job_set.add(id, pid, JobState::Running, &display_name);
		state.report(format_args!("[{}] ({})\n", id, pid))?;
	} else {
		let event = state.backend.wait_for_status_change(pid, false)?;
		debug!(%pid, ?event, "foreground job changed status");
		match event {
			StatusEvent::Stopped(sig) => {
				let id = state.next_job_id();
				state.job_set.add(id, pid, JobState::Stopped, &display_name);
				state.report(format_args!("[{}] ({}) suspended by signal {}\n", id, pid, sig))?;
			},
			StatusEvent::Signaled(sig) => {
				// Uses up a job id without registering anything.
				let id = state.next_job_id();
				state.report(format_args!("[{}] ({}) terminated by signal {}\n", id, pid, sig))?;
			},
			StatusEvent::Exited(..) | StatusEvent::Continued | StatusEvent::Unchanged => {},
		}
	}
	state.restore_terminal()
}
