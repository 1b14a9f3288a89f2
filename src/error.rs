//! Error kinds for the checker core.
//!
//! Only conditions that stop the run outright (bad magic, unsupported
//! geometry, I/O failure during a write-back, an internal-consistency
//! assertion) are modeled as `Err`. Everything a human operator can be
//! asked about is resolved in place through the operator interface and
//! tallied on the running [`crate::checker::Context`] instead.

use std::fmt;
use std::io;

/// A fatal condition: the run cannot continue.
#[derive(Debug)]
pub enum CheckError {
	/// Malformed input that makes the image impossible to interpret
	/// (bad magic, unsupported block size, bitmap sizes that don't fit the
	/// declared inode/zone counts, a directory tree that isn't actually a
	/// tree where one was required).
	Corrupt(String),
	/// The underlying device could not be read from or written to.
	Io(io::Error),
}

impl fmt::Display for CheckError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Corrupt(msg) => write!(f, "{msg}"),
			Self::Io(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for CheckError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Corrupt(_) => None,
			Self::Io(e) => Some(e),
		}
	}
}

impl From<io::Error> for CheckError {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

pub type Result<T> = std::result::Result<T, CheckError>;
