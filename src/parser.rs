use thiserror::Error;

use crate::types::*;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ParseError {
	#[error("ERROR - Can't have two input redirects on one line.")]
	DuplicateInput,
	#[error("ERROR - Can't have two output redirects on one line.")]
	DuplicateOutput,
	#[error("ERROR - No redirection file specified.")]
	MissingFile,
	#[error("ERROR - No command.")]
	NoCommand,
}

type ParseResult<T> = Result<T, ParseError>;

struct Tokenizer<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Tokenizer<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t')
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Tokenizer::is_whitespace);
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(|c| !Tokenizer::is_whitespace(c));
		&self.line[orig .. self.i]
	}
}

impl<'a> Iterator for Tokenizer<'a> {
	type Item = &'a [u8];

	fn next(&mut self) -> Option<&'a [u8]> {
		self.skip_whitespaces();
		let word = self.read_word();
		if word.is_empty() { None } else { Some(word) }
	}
}

/// Splits a line on runs of spaces and tabs. Never yields an empty token.
pub fn tokenize(line: &[u8]) -> Vec<&[u8]> {
	Tokenizer { line, i: 0 }.collect()
}

fn redirect_type(token: &[u8]) -> Option<RedirectType> {
	match token {
		b"<" => Some(RedirectType::Input),
		b">" => Some(RedirectType::Output),
		b">>" => Some(RedirectType::Append),
		_ => None,
	}
}

/// Moves every `<`, `>` and `>>` operator together with the filename after it out of
/// `tokens` into `redirects`, returning the remaining tokens in order.
pub fn extract_redirects<'a>(tokens: &[&'a [u8]], redirects: &mut RedirectSpec<'a>) -> ParseResult<Vec<&'a [u8]>> {
	let mut arguments = Vec::with_capacity(tokens.len());
	let mut i = 0;
	while i < tokens.len() {
		let typ = match redirect_type(tokens[i]) {
			Some(typ) => typ,
			None => {
				arguments.push(tokens[i]);
				i += 1;
				continue;
			},
		};
		if redirects.is_set(typ) {
			return Err(match typ {
				RedirectType::Input => ParseError::DuplicateInput,
				RedirectType::Output | RedirectType::Append => ParseError::DuplicateOutput,
			});
		}
		let target = match tokens.get(i + 1) {
			Some(&target) => target,
			None => { return Err(ParseError::MissingFile); },
		};
		match typ {
			RedirectType::Input => redirects.input = Some(target),
			RedirectType::Output => redirects.output = Some((target, OutputMode::Truncate)),
			RedirectType::Append => redirects.output = Some((target, OutputMode::Append)),
		}
		i += 2;
	}
	Ok(arguments)
}

/// Parses one input line. `Ok(None)` means the line holds nothing to run.
pub fn parse(line: &[u8]) -> ParseResult<Option<Line<'_>>> {
	let mut tokens = tokenize(line);
	if tokens.is_empty() {
		return Ok(None);
	}

	let is_background = tokens.last() == Some(&&b"&"[..]);
	if is_background {
		tokens.pop();
	}

	match tokens.first() {
		None => { return Err(ParseError::NoCommand); },
		Some(first) if matches!(first[0], b'<' | b'>') && tokens.len() <= 2 => {
			return Err(ParseError::NoCommand);
		},
		Some(_) => {},
	}

	let mut redirects = RedirectSpec::default();
	let arguments = extract_redirects(&tokens, &mut redirects)?;
	if arguments.is_empty() {
		return Err(ParseError::NoCommand);
	}

	Ok(Some(Line {
		command: Command { arguments },
		redirects,
		is_background,
	}))
}
