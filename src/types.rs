#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

/// How standard output is rebound. `>` and `>>` share one slot.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OutputMode { Truncate, Append }

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct RedirectSpec<'a> {
	pub input: Option<&'a [u8]>,
	pub output: Option<(&'a [u8], OutputMode)>,
}

impl<'a> RedirectSpec<'a> {
	pub fn output_truncate(&self) -> Option<&'a [u8]> {
		match self.output {
			Some((target, OutputMode::Truncate)) => Some(target),
			_ => None,
		}
	}

	pub fn output_append(&self) -> Option<&'a [u8]> {
		match self.output {
			Some((target, OutputMode::Append)) => Some(target),
			_ => None,
		}
	}

	pub fn is_set(&self, typ: RedirectType) -> bool {
		match typ {
			RedirectType::Input => self.input.is_some(),
			RedirectType::Output | RedirectType::Append => self.output.is_some(),
		}
	}
}

/// The argument vector left once redirections are taken out.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command<'a> {
	pub arguments: Vec<&'a [u8]>,
}

impl<'a> Command<'a> {
	pub fn name(&self) -> &'a [u8] {
		self.arguments[0]
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Line<'a> {
	pub command: Command<'a>,
	pub redirects: RedirectSpec<'a>,
	pub is_background: bool,
}
