use std::io::{self, Read};

use nix::unistd;
use tracing::{debug, trace};

use crate::builtin::{self, Flow};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::eval;
use crate::global::State;
use crate::parser;
use crate::process::Backend;
use crate::reap;

/// Unbuffered standard input. Nothing past the current line is consumed, so
/// children inheriting fd 0 see the rest of the input.
pub struct RawStdin;

impl Read for RawStdin {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		Ok(unistd::read(libc::STDIN_FILENO, buf)?)
	}
}

/// Reads up to and including the next newline, but no more than `max` bytes.
/// Returns the number of bytes read; 0 means end of input.
pub fn read_line<R: Read + ?Sized>(input: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<usize> {
	buf.clear();
	let mut byte = [0u8];
	while buf.len() < max {
		match input.read(&mut byte) {
			Ok(0) => break,
			Ok(_) => {
				buf.push(byte[0]);
				if byte[0] == b'\n' { break; }
			},
			Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {},
			Err(e) => return Err(e),
		}
	}
	Ok(buf.len())
}

fn eval_line<B: Backend>(state: &mut State<B>, line: &[u8]) -> Result<Flow> {
	let line = match parser::parse(line)? {
		Some(line) => line,
		None => return Ok(Flow::Continue),
	};
	trace!(?line, "parsed");
	if let Some(builtin) = builtin::match_builtin::<B>(line.command.name()) {
		return builtin(state, &line.command.arguments);
	}
	eval::launch(state, &line)?;
	Ok(Flow::Continue)
}

/// Runs the read-eval loop until `exit` or end of input, returning the exit status.
/// Fatal errors are handed back to the caller.
pub fn run<B: Backend, R: Read + ?Sized>(state: &mut State<B>, config: &Config, input: &mut R) -> Result<i32> {
	let mut buf = Vec::with_capacity(config.max_line);
	loop {
		reap::reap(state)?;
		if let Some(prompt) = config.prompt {
			state.report(format_args!("{}", prompt))?;
		}
		if read_line(input, &mut buf, config.max_line).map_err(Error::Read)? == 0 {
			return Ok(0);
		}
		if buf.last() == Some(&b'\n') {
			buf.pop();
		}
		match eval_line(state, &buf) {
			Ok(Flow::Continue) => {},
			Ok(Flow::Exit(code)) => return Ok(code),
			Err(e) if e.is_fatal() => return Err(e),
			Err(e) => {
				debug!(error = ?e, "line abandoned");
				state.diagnose(&e);
			},
		}
	}
}
