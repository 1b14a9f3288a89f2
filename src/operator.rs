//! The yes/no oracle the checker consults for every repair decision.
//!
//! The checker never interprets the question text or tracks whether an
//! answer counts as a "repair" — that bookkeeping (the uncorrectable
//! flag) lives on [`crate::checker::Context::ask`], which is uniform
//! across all three policies: any `false` answer raises it, regardless of
//! why the answer came back `false`.

use utils::prompt::ask_yes_no;
use utils::prompt::RawTerm;

pub trait Operator {
	fn ask(&mut self, question: &str, default: bool) -> bool;
}

/// Never repairs anything; every question is answered `no`.
pub struct ReadOnly;

impl Operator for ReadOnly {
	fn ask(&mut self, _question: &str, _default: bool) -> bool {
		false
	}
}

/// Answers every question with the caller-supplied default, without
/// prompting.
pub struct Automatic;

impl Operator for Automatic {
	fn ask(&mut self, _question: &str, default: bool) -> bool {
		default
	}
}

/// Prompts on the controlling terminal for each question.
pub struct Interactive {
	_raw: RawTerm,
}

impl Interactive {
	pub fn new() -> Self {
		Self {
			_raw: RawTerm::enable(),
		}
	}
}

impl Default for Interactive {
	fn default() -> Self {
		Self::new()
	}
}

impl Operator for Interactive {
	fn ask(&mut self, question: &str, default: bool) -> bool {
		ask_yes_no(question, default)
	}
}
