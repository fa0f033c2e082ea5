use std::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::job::JobSet;
use crate::process::Backend;
use crate::search::SearchCache;

/// Everything one shell session owns. Dropping it releases the job registry.
pub struct State<B: Backend> {
	pub backend: B,
	pub search_cache: SearchCache,
	pub job_set: JobSet,
	pub shell_pgid: nix::unistd::Pid,
	last_job_id: u32,
	out: Box<dyn Write>,
	err: Box<dyn Write>,
}

impl<B: Backend> State<B> {
	pub fn new(backend: B, search_cache: SearchCache, out: Box<dyn Write>, err: Box<dyn Write>) -> State<B> {
		let shell_pgid = backend.shell_pgid();
		State {
			backend,
			search_cache,
			job_set: JobSet::new(),
			shell_pgid,
			last_job_id: 0,
			out,
			err,
		}
	}

	/// Job ids start at 1 and are never handed out twice.
	pub fn next_job_id(&mut self) -> u32 {
		self.last_job_id += 1;
		self.last_job_id
	}

	/// Writes a status line (or prompt) to the shell's output and flushes it.
	pub fn report(&mut self, args: fmt::Arguments) -> Result<()> {
		self.out.write_fmt(args)
			.and_then(|_| self.out.flush())
			.map_err(Error::Print)
	}

	/// Tells the user why a line was abandoned. Nothing is left to report a failure to.
	pub fn diagnose(&mut self, e: &Error) {
		let _ = writeln!(self.err, "{}", e).and_then(|_| self.err.flush());
	}

	pub fn print_jobs(&mut self) -> Result<()> {
		self.job_set.print(&mut *self.out).map_err(Error::Print)
	}

	pub fn restore_terminal(&mut self) -> Result<()> {
		let pgid = self.shell_pgid;
		self.backend.give_terminal(pgid)
	}
}
