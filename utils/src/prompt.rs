//! This module implements raw-mode terminal prompting.

use libc::ECHO;
use libc::ICANON;
use libc::STDIN_FILENO;
use libc::TCSANOW;
use libc::VMIN;
use libc::tcgetattr;
use libc::tcsetattr;
use libc::termios;
use std::io;
use std::io::Read;
use std::io::Write;
use std::mem::MaybeUninit;

/// Puts the controlling terminal into raw mode (no line buffering, no echo)
/// for the lifetime of the guard, restoring the previous state on drop.
///
/// Used by an interactive yes/no prompt so that a single keypress answers
/// the question without requiring the user to press enter.
pub struct RawTerm {
	saved: termios,
}

impl RawTerm {
	/// Saves the current terminal state and switches to raw mode.
	pub fn enable() -> Self {
		let saved = unsafe {
			let mut t: termios = MaybeUninit::zeroed().assume_init();
			tcgetattr(STDIN_FILENO, &mut t);
			t
		};

		let mut raw = saved.clone();
		raw.c_lflag &= !(ICANON | ECHO);
		raw.c_cc[VMIN] = 1;
		unsafe {
			tcsetattr(STDIN_FILENO, TCSANOW, &raw);
		}

		Self { saved }
	}
}

impl Drop for RawTerm {
	fn drop(&mut self) {
		unsafe {
			tcsetattr(STDIN_FILENO, TCSANOW, &self.saved);
		}
	}
}

/// Prints `question` and reads a single raw byte from stdin, returning
/// `None` on EOF. Does not require a trailing newline.
pub fn read_char(question: &str) -> Option<u8> {
	print!("{question}");
	let _ = io::stdout().flush();

	let mut buf = [0u8; 1];
	let n = io::stdin().lock().read(&mut buf).unwrap_or(0);
	if n == 0 {
		None
	} else {
		Some(buf[0])
	}
}

/// Asks `question` and waits for a single `y`/`n` keystroke (case
/// insensitive). Space or newline accepts `default`; EOF also accepts
/// `default`. The terminal is expected to already be in raw mode (see
/// [`RawTerm`]) so that no enter key is needed.
pub fn ask_yes_no(question: &str, default: bool) -> bool {
	let suffix = if default { "? (y/n) " } else { "? (n/y) " };
	let mut prompt = format!("{question}{suffix}");

	loop {
		let Some(c) = read_char(&prompt) else {
			println!();
			return default;
		};
		match c {
			b'y' | b'Y' => {
				println!("y");
				return true;
			}
			b'n' | b'N' => {
				println!("n");
				return false;
			}
			b' ' | b'\n' | b'\r' => {
				println!("{}", if default { "y" } else { "n" });
				return default;
			}
			_ => {
				prompt = format!("{question}{suffix}");
			}
		}
	}
}
