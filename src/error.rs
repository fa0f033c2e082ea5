use std::borrow::Cow;
use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::parser::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Parse(#[from] ParseError),
	#[error("{0}: syntax error")]
	Syntax(&'static str),
	#[error("{0}: job input does not begin with %")]
	MissingPercent(&'static str),
	#[error("job not found")]
	JobNotFound,
	#[error("ERROR - Argument contains a nul byte.")]
	NulByte,

	#[error("{0}: {desc}", desc = .1.desc())]
	Sys(&'static str, #[source] nix::Error),
	#[error("{0}: {msg}", msg = strerror(.1))]
	Io(&'static str, #[source] io::Error),
	#[error("ERROR - Child process did not execute properly.")]
	Wait(#[source] nix::Error),
	#[error("ERROR - Message did not print successfully.")]
	Print(#[source] io::Error),
	#[error("ERROR - Input not read successfully.")]
	Read(#[source] io::Error),
}

/// The bare `strerror` text for OS errors, without Rust's `(os error N)` suffix.
fn strerror(e: &io::Error) -> Cow<'static, str> {
	match e.raw_os_error() {
		Some(raw) => Cow::Borrowed(Errno::from_raw(raw).desc()),
		None => Cow::Owned(e.to_string()),
	}
}

impl Error {
	/// Fatal errors end the session; everything else only abandons the current line.
	pub fn is_fatal(&self) -> bool {
		match *self {
			Error::Parse(..) | Error::Syntax(..) | Error::MissingPercent(..) | Error::JobNotFound | Error::NulByte => false,
			Error::Sys(..) | Error::Io(..) | Error::Wait(..) | Error::Print(..) | Error::Read(..) => true,
		}
	}
}

pub trait Context<T> {
	fn context(self, what: &'static str) -> Result<T>;
}

impl<T> Context<T> for nix::Result<T> {
	fn context(self, what: &'static str) -> Result<T> {
		self.map_err(|e| Error::Sys(what, e))
	}
}

impl<T> Context<T> for io::Result<T> {
	fn context(self, what: &'static str) -> Result<T> {
		self.map_err(|e| Error::Io(what, e))
	}
}
