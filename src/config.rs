use std::{env, io};

use tracing_subscriber::EnvFilter;

const PROMPT: &str = "jobsh> ";

/// Longest line read at once, newline included.
pub const MAX_LINE: usize = 1024;

pub const LOG_ENV: &str = "JOBSH_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone)]
pub struct Config {
	pub prompt: Option<&'static str>,
	pub max_line: usize,
	pub log_filter: String,
}

impl Config {
	pub fn from_env() -> Config {
		Config {
			prompt: if cfg!(feature = "prompt") { Some(PROMPT) } else { None },
			max_line: MAX_LINE,
			log_filter: env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
		}
	}

	/// Logs go to stderr so stdout only carries shell output.
	pub fn init_logging(&self) {
		let filter = EnvFilter::try_new(&self.log_filter)
			.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(io::stderr)
			.try_init();
	}
}

impl Default for Config {
	fn default() -> Config {
		Config { prompt: None, max_line: MAX_LINE, log_filter: DEFAULT_LOG_FILTER.to_string() }
	}
}
