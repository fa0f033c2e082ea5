mod builtin;
mod config;
mod error;
mod eval;
mod global;
mod job;
mod parser;
mod process;
mod reap;
mod repl;
mod search;
mod types;


use std::io::{self, Write};
use std::process::exit;

use config::Config;
use error::Result;
use process::UnixBackend;
use search::SearchCache;

fn run(config: &Config) -> Result<i32> {
	process::ignore_job_control_signals()?;
	let mut state = global::State::new(UnixBackend::new(), SearchCache::new(), Box::new(io::stdout()), Box::new(io::stderr()));
	repl::run(&mut state, config, &mut repl::RawStdin)
}

fn main() {
	let config = Config::from_env();
	config.init_logging();
	// The session, and with it the job registry, is gone before we exit.
	let status = match run(&config) {
		Ok(status) => status,
		Err(e) => {
			let _ = writeln!(io::stderr(), "{}", e);
			1
		},
	};
	exit(status)
}
