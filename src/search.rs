use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::{env, fs, io};

use tracing::trace;

/// Maps command names to the first matching file along `$PATH`.
pub struct SearchCache {
	imp: HashMap<OsString, PathBuf>,
	path: Option<OsString>,
}

const PATH_KEY: &str = "PATH";
const EXEC_BITS: u32 = 0o111;

impl SearchCache {
	pub fn new() -> SearchCache {
		SearchCache::with_path(env::var_os(PATH_KEY))
	}

	pub fn with_path(path: Option<OsString>) -> SearchCache {
		let mut this = SearchCache { imp: HashMap::new(), path };
		this.rehash();
		this
	}

	/// Caches files anyone may execute. Symlinks are followed.
	fn add_entry(&mut self, entry: io::Result<fs::DirEntry>) -> io::Result<()> {
		let e = entry?;
		let path = e.path();
		let meta = fs::metadata(&path)?;
		if meta.is_dir() || meta.permissions().mode() & EXEC_BITS == 0 {
			return Ok(());
		}
		self.imp.entry(e.file_name()).or_insert(path);
		Ok(())
	}

	pub fn rehash(&mut self) {
		self.imp.clear();
		let path = match self.path.clone() {
			Some(path) => path,
			None => return,
		};
		for dir in env::split_paths(&path) {
			if let Ok(entries) = fs::read_dir(dir) {
				for entry in entries {
					let _ = self.add_entry(entry);
				}
			}
		}
		trace!(entries = self.imp.len(), "search cache rebuilt");
	}

	pub fn lookup(&self, name: &OsStr) -> Option<&PathBuf> {
		self.imp.get(name)
	}

	/// Like `lookup`, but rebuilds the cache once before giving up.
	pub fn lookup_or_rehash(&mut self, name: &OsStr) -> Option<PathBuf> {
		if self.lookup(name).is_none() {
			self.rehash();
		}
		self.imp.get(name).cloned()
	}
}
