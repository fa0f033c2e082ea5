use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::{env, fs};

use tracing::debug;

use crate::error::{Context, Error, Result};
use crate::global::State;
use crate::job::JobState;
use crate::process::Backend;
use crate::reap;

/// What the REPL does after a command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow {
	Continue,
	Exit(i32),
}

pub type Builtin<B> = fn(&mut State<B>, &[&[u8]]) -> Result<Flow>;

fn path(arg: &[u8]) -> &OsStr {
	OsStr::from_bytes(arg)
}

pub fn builtin_cd<B: Backend>(_: &mut State<B>, args: &[&[u8]]) -> Result<Flow> {
	if args.len() < 2 {
		return Err(Error::Syntax("cd"));
	}
	env::set_current_dir(path(args[1])).context("cd")?;
	Ok(Flow::Continue)
}

pub fn builtin_ln<B: Backend>(_: &mut State<B>, args: &[&[u8]]) -> Result<Flow> {
	if args.len() < 3 {
		return Err(Error::Syntax("ln"));
	}
	fs::hard_link(path(args[1]), path(args[2])).context("ln")?;
	Ok(Flow::Continue)
}

pub fn builtin_rm<B: Backend>(_: &mut State<B>, args: &[&[u8]]) -> Result<Flow> {
	if args.len() < 2 {
		return Err(Error::Syntax("rm"));
	}
	fs::remove_file(path(args[1])).context("rm")?;
	Ok(Flow::Continue)
}

pub fn builtin_exit<B: Backend>(_: &mut State<B>, _: &[&[u8]]) -> Result<Flow> {
	Ok(Flow::Exit(0))
}

pub fn builtin_jobs<B: Backend>(state: &mut State<B>, _: &[&[u8]]) -> Result<Flow> {
	state.print_jobs()?;
	Ok(Flow::Continue)
}

/// Reads the number after the `%` the way `atoi` does: an optional sign, then
/// leading decimal digits. No digits gives 0, and so does a negative number,
/// since neither names a job.
fn parse_job_id(spec: &[u8]) -> u32 {
	let (negative, digits) = match spec.split_first() {
		Some((b'+', rest)) => (false, rest),
		Some((b'-', rest)) => (true, rest),
		_ => (false, spec),
	};
	let n = digits.iter()
		.take_while(|c| c.is_ascii_digit())
		.fold(0u32, |n, &c| n.saturating_mul(10).saturating_add(u32::from(c - b'0')));
	if negative { 0 } else { n }
}

fn job_operand<B: Backend>(state: &State<B>, name: &'static str, args: &[&[u8]]) -> Result<(u32, nix::unistd::Pid)> {
	let spec = match args.get(1) {
		Some(spec) => spec,
		None => return Err(Error::Syntax(name)),
	};
	if spec.first() != Some(&b'%') {
		return Err(Error::MissingPercent(name));
	}
	let id = parse_job_id(&spec[1..]);
	match state.job_set.pid_of(id) {
		Some(pid) => Ok((id, pid)),
		None => Err(Error::JobNotFound),
	}
}

pub fn builtin_bg<B: Backend>(state: &mut State<B>, args: &[&[u8]]) -> Result<Flow> {
	let (id, pid) = job_operand(state, "bg", args)?;
	state.backend.continue_group(pid)?;
	state.job_set.set_state(id, JobState::Running);
	debug!(id, %pid, "continued in background");
	Ok(Flow::Continue)
}

pub fn builtin_fg<B: Backend>(state: &mut State<B>, args: &[&[u8]]) -> Result<Flow> {
	let (id, pid) = job_operand(state, "fg", args)?;
	state.backend.give_terminal(pid)?;
	state.backend.continue_group(pid)?;
	state.job_set.set_state(id, JobState::Running);
	debug!(id, %pid, "continued in foreground");
	let event = state.backend.wait_for_status_change(pid, false)?;
	reap::settle(state, id, pid, event, true)?;
	state.restore_terminal()?;
	Ok(Flow::Continue)
}

pub fn match_builtin<B: Backend>(name: &[u8]) -> Option<Builtin<B>> {
	match name {
		b"cd" => Some(builtin_cd::<B>),
		b"ln" => Some(builtin_ln::<B>),
		b"rm" => Some(builtin_rm::<B>),
		b"exit" => Some(builtin_exit::<B>),
		b"jobs" => Some(builtin_jobs::<B>),
		b"bg" => Some(builtin_bg::<B>),
		b"fg" => Some(builtin_fg::<B>),
		_ => None,
	}
}
