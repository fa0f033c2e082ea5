use std::convert::Infallible;
use std::ffi::{CStr, CString, OsStr};
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{self, WaitPidFlag};
use nix::unistd::{self, ForkResult, Pid};
use tracing::{debug, trace};

use crate::error::{Context, Error, Result};
use crate::job::{StatusEvent, WaitStatusExt};
use crate::types::RedirectSpec;

/// Signals the shell ignores itself and every launched program gets back at default.
pub const JOB_CONTROL_SIGNALS: [Signal; 4] = [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGQUIT, Signal::SIGTTOU];

const FILE_MODE: u32 = 0o666;

/// Everything needed to start one program.
#[derive(Debug)]
pub struct LaunchSpec<'a> {
	/// File handed to `execv`.
	pub program: &'a Path,
	/// Argument vector as the program sees it.
	pub arguments: &'a [&'a [u8]],
	pub redirects: &'a RedirectSpec<'a>,
	pub foreground: bool,
}

pub trait Backend {
	fn shell_pgid(&self) -> Pid;

	/// Starts the program as the leader of a new process group.
	fn launch(&mut self, spec: &LaunchSpec) -> Result<Pid>;

	fn wait_for_status_change(&mut self, pid: Pid, non_blocking: bool) -> Result<StatusEvent>;

	fn continue_group(&mut self, pgid: Pid) -> Result<()>;

	fn give_terminal(&mut self, pgid: Pid) -> Result<()>;
}

pub fn tcsetpgrp(fd: RawFd, pgid: Pid) -> nix::Result<()> {
	Errno::result(unsafe { libc::tcsetpgrp(fd, pgid.as_raw()) }).map(drop)
}

pub fn ignore_job_control_signals() -> Result<()> {
	for &sig in &JOB_CONTROL_SIGNALS {
		unsafe { signal::signal(sig, SigHandler::SigIgn) }.context("signal")?;
	}
	Ok(())
}

/// Real processes. Terminal ownership is only moved when stdin is a terminal.
pub struct UnixBackend {
	interactive: bool,
	shell_pgid: Pid,
}

impl UnixBackend {
	pub fn new() -> UnixBackend {
		let interactive = io::stdin().is_terminal();
		let shell_pgid = unistd::getpgrp();
		debug!(interactive, %shell_pgid, "process backend ready");
		UnixBackend { interactive, shell_pgid }
	}
}

fn to_cstring(bytes: &[u8]) -> Result<CString> {
	CString::new(bytes).map_err(|_| Error::NulByte)
}

fn redirect(target: &[u8], options: &fs::OpenOptions, to: RawFd) -> Result<()> {
	let file = options.open(OsStr::from_bytes(target)).context("open")?;
	let fd = file.into_raw_fd();
	unistd::dup2(fd, to).context("dup2")?;
	unistd::close(fd).context("close")?;
	Ok(())
}

fn do_exec_child(spec: &LaunchSpec, program: &CStr, argv: &[CString], interactive: bool) -> Result<Infallible> {
	unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)).context("setpgid")?;
	if spec.foreground && interactive {
		tcsetpgrp(libc::STDIN_FILENO, unistd::getpid()).context("tcsetpgrp")?;
	}
	for &sig in &JOB_CONTROL_SIGNALS {
		unsafe { signal::signal(sig, SigHandler::SigDfl) }.context("signal")?;
	}

	if let Some(input) = spec.redirects.input {
		redirect(input, fs::OpenOptions::new().read(true), libc::STDIN_FILENO)?;
	}
	if let Some(output) = spec.redirects.output_truncate() {
		let mut oopt = fs::OpenOptions::new();
		oopt.write(true).create(true).truncate(true).mode(FILE_MODE);
		redirect(output, &oopt, libc::STDOUT_FILENO)?;
	}
	if let Some(output) = spec.redirects.output_append() {
		let mut oopt = fs::OpenOptions::new();
		oopt.append(true).create(true).mode(FILE_MODE);
		redirect(output, &oopt, libc::STDOUT_FILENO)?;
	}

	unistd::execv(program, argv).context("execv")
}

fn exec_child(spec: &LaunchSpec, program: &CStr, argv: &[CString], interactive: bool) -> ! {
	let e = match do_exec_child(spec, program, argv, interactive) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	let _ = writeln!(io::stderr(), "{}", e);
	unsafe { libc::_exit(1) }
}

impl Backend for UnixBackend {
	fn shell_pgid(&self) -> Pid {
		self.shell_pgid
	}

	fn launch(&mut self, spec: &LaunchSpec) -> Result<Pid> {
		let program = to_cstring(spec.program.as_os_str().as_bytes())?;
		let argv = spec.arguments.iter().map(|&a| to_cstring(a)).collect::<Result<Vec<CString>>>()?;
		let _ = io::stdout().flush();

		match unsafe { unistd::fork() }.context("fork")? {
			ForkResult::Parent { child } => {
				// Also done by the child; whichever runs first wins.
				let _ = unistd::setpgid(child, child);
				debug!(pid = %child, program = %spec.program.display(), foreground = spec.foreground, "launched");
				Ok(child)
			},
			ForkResult::Child => exec_child(spec, &program, &argv, self.interactive),
		}
	}

	fn wait_for_status_change(&mut self, pid: Pid, non_blocking: bool) -> Result<StatusEvent> {
		let flags = if non_blocking {
			WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED
		} else {
			WaitPidFlag::WUNTRACED
		};
		let status = wait::waitpid(pid, Some(flags)).map_err(Error::Wait)?;
		trace!(%pid, ?status, "waited");
		Ok(status.event())
	}

	fn continue_group(&mut self, pgid: Pid) -> Result<()> {
		signal::killpg(pgid, Signal::SIGCONT).context("kill")
	}

	fn give_terminal(&mut self, pgid: Pid) -> Result<()> {
		if !self.interactive {
			return Ok(());
		}
		trace!(%pgid, "terminal handed over");
		tcsetpgrp(libc::STDIN_FILENO, pgid).context("tcsetpgrp")
	}
}

#[cfg(test)]
pub mod fake {
	use std::collections::{HashMap, VecDeque};
	use std::path::PathBuf;

	use super::*;
	use crate::types::OutputMode;

	pub const SHELL_PGID: i32 = 1000;
	const FIRST_PID: i32 = 2000;

	#[derive(Debug, Clone, PartialEq, Eq)]
	pub struct Launched {
		pub pid: Pid,
		pub program: PathBuf,
		pub arguments: Vec<Vec<u8>>,
		pub input: Option<Vec<u8>>,
		pub output: Option<(Vec<u8>, OutputMode)>,
		pub foreground: bool,
	}

	/// One scripted answer to a wait.
	struct Outcome {
		result: std::result::Result<StatusEvent, Errno>,
		/// Held back from `WNOHANG` polls, like a change that has not happened yet.
		blocking_only: bool,
	}

	/// Scripted stand-in for real processes. Pids are handed out from 2000 upwards.
	/// A blocking wait with nothing scripted reports a clean exit.
	pub struct FakeBackend {
		pub launched: Vec<Launched>,
		pub continued: Vec<Pid>,
		pub terminal: Pid,
		pub terminal_history: Vec<Pid>,
		pub waits: Vec<(Pid, bool)>,
		/// Makes every `continue_group` fail with this errno.
		pub continue_error: Option<Errno>,
		outcomes: HashMap<Pid, VecDeque<Outcome>>,
		next_pid: i32,
	}

	impl FakeBackend {
		pub fn new() -> FakeBackend {
			FakeBackend {
				launched: vec![],
				continued: vec![],
				terminal: Pid::from_raw(SHELL_PGID),
				terminal_history: vec![],
				waits: vec![],
				continue_error: None,
				outcomes: HashMap::new(),
				next_pid: FIRST_PID,
			}
		}

		/// Pid the `n`th launch (counting from 0) will get.
		pub fn pid(n: i32) -> Pid {
			Pid::from_raw(FIRST_PID + n)
		}

		fn queue(&mut self, pid: Pid, result: std::result::Result<StatusEvent, Errno>, blocking_only: bool) {
			self.outcomes.entry(pid).or_default().push_back(Outcome { result, blocking_only });
		}

		/// Reported by the next wait on `pid`, polling or not.
		pub fn script(&mut self, pid: Pid, event: StatusEvent) {
			self.queue(pid, Ok(event), false);
		}

		/// Reported by the next blocking wait on `pid`; polls see nothing until then.
		pub fn script_blocking(&mut self, pid: Pid, event: StatusEvent) {
			self.queue(pid, Ok(event), true);
		}

		/// The next wait on `pid` fails with `errno`.
		pub fn fail_wait(&mut self, pid: Pid, errno: Errno) {
			self.queue(pid, Err(errno), false);
		}

		/// The next blocking wait on `pid` fails with `errno`.
		pub fn fail_blocking_wait(&mut self, pid: Pid, errno: Errno) {
			self.queue(pid, Err(errno), true);
		}
	}

	impl Backend for FakeBackend {
		fn shell_pgid(&self) -> Pid {
			Pid::from_raw(SHELL_PGID)
		}

		fn launch(&mut self, spec: &LaunchSpec) -> Result<Pid> {
			let pid = Pid::from_raw(self.next_pid);
			self.next_pid += 1;
			if spec.foreground {
				self.give_terminal(pid)?;
			}
			self.launched.push(Launched {
				pid,
				program: spec.program.to_path_buf(),
				arguments: spec.arguments.iter().map(|a| a.to_vec()).collect(),
				input: spec.redirects.input.map(|t| t.to_vec()),
				output: spec.redirects.output.map(|(t, mode)| (t.to_vec(), mode)),
				foreground: spec.foreground,
			});
			Ok(pid)
		}

		fn wait_for_status_change(&mut self, pid: Pid, non_blocking: bool) -> Result<StatusEvent> {
			self.waits.push((pid, non_blocking));
			let queue = self.outcomes.entry(pid).or_default();
			let ready = queue.front().map_or(false, |o| !(non_blocking && o.blocking_only));
			let outcome = if ready { queue.pop_front() } else { None };
			match outcome {
				Some(outcome) => outcome.result.map_err(Error::Wait),
				None if non_blocking => Ok(StatusEvent::Unchanged),
				None => Ok(StatusEvent::Exited(0)),
			}
		}

		fn continue_group(&mut self, pgid: Pid) -> Result<()> {
			if let Some(errno) = self.continue_error {
				return Err(Error::Sys("kill", errno));
			}
			self.continued.push(pgid);
			Ok(())
		}

		fn give_terminal(&mut self, pgid: Pid) -> Result<()> {
			self.terminal = pgid;
			self.terminal_history.push(pgid);
			Ok(())
		}
	}
}
