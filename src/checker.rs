//! Ties the individual passes together behind one [`Context`] that gets
//! threaded through instead of the global mutable state the original tool
//! used. `run` is the single entry point `main.rs` calls.

use std::path::Path;

use crate::blockio::BlockDevice;
use crate::error::Result;
use crate::operator::Operator;
use crate::reachability;
use crate::reconcile;
use crate::report;
use crate::superblock::Superblock;
use crate::tables::Tables;
use crate::traverse;
use crate::writeback;
use crate::BLOCK_SIZE;

#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
	pub regular: u32,
	pub directory: u32,
	pub chardev: u32,
	pub blockdev: u32,
	pub links: u32,
	pub symlinks: u32,
	pub total: u32,
}

/// Caps how deep a path is rendered in diagnostics; a directory tree
/// nested deeper than this keeps being walked, it just stops growing the
/// rendered path.
const MAX_DEPTH: usize = 50;

#[derive(Default)]
pub struct NameStack {
	entries: Vec<String>,
	depth: usize,
}

impl NameStack {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, name: &str) {
		if self.entries.len() < MAX_DEPTH {
			self.entries.push(name.to_string());
		}
		self.depth += 1;
	}

	pub fn pop(&mut self) {
		if self.entries.len() == self.depth {
			self.entries.pop();
		}
		self.depth = self.depth.saturating_sub(1);
	}

	pub fn render(&self) -> String {
		format!("/{}", self.entries.join("/"))
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
	pub list: bool,
	pub verbose: bool,
	pub show: bool,
	pub warn_mode: bool,
	pub force: bool,
	/// True when `-a` or `-r` was given, i.e. this run is allowed to write.
	pub repair: bool,
}

pub struct Context {
	pub dev: BlockDevice,
	pub sb: Superblock,
	pub tables: Tables,
	pub operator: Box<dyn Operator>,
	pub names: NameStack,
	pub changed: bool,
	pub errors_uncorrected: bool,
	pub stats: Stats,
	pub flags: RunFlags,
}

impl Context {
	/// Asks the operator a yes/no question. Any `false` answer — whatever
	/// the policy's reason for giving it — raises the uncorrectable flag.
	pub fn ask(&mut self, question: &str, default: bool) -> bool {
		let answer = self.operator.ask(question, default);
		if !answer {
			self.errors_uncorrected = true;
		}
		answer
	}

	/// Reads a zone's data block, zero-filling holes and raising the
	/// uncorrectable flag on I/O failure.
	pub fn read_zone_block(&mut self, nr: u32) -> Vec<u8> {
		let mut buf = vec![0u8; BLOCK_SIZE];
		if !self.dev.read_block(nr, &mut buf) {
			self.errors_uncorrected = true;
		}
		buf
	}

	/// Writes a zone's data block immediately (used for indirect blocks
	/// corrected mid-traversal), raising the uncorrectable flag if the
	/// write is dropped or fails.
	pub fn write_zone_block(&mut self, nr: u32, buf: &[u8]) {
		let g = self.sb.geometry;
		if !self
			.dev
			.write_block(nr, buf, g.firstdatazone, g.zones)
		{
			self.errors_uncorrected = true;
		}
	}
}

pub enum Outcome {
	/// The filesystem was already marked clean and `-f` wasn't given, so
	/// nothing was read beyond the superblock.
	Clean,
	Checked {
		changed: bool,
		uncorrected: bool,
	},
}

pub fn run(path: &Path, operator: Box<dyn Operator>, flags: RunFlags) -> Result<Outcome> {
	let mut dev = BlockDevice::open(path, flags.repair)?;
	let mut sb = Superblock::read(&mut dev)?;

	if sb.is_clean() && !flags.force {
		return Ok(Outcome::Clean);
	}

	let tables = Tables::load(&mut dev, &mut sb)?;
	let mut ctx = Context {
		dev,
		sb,
		tables,
		operator,
		names: NameStack::new(),
		changed: false,
		errors_uncorrected: false,
		stats: Stats::default(),
		flags,
	};

	if ctx.sb.geometry.firstzone_mismatch {
		let g = ctx.sb.geometry;
		println!(
			"Warning: First data zone is not on a predictable offset: {} instead of {}.",
			g.firstdatazone, g.norm_firstdatazone
		);
		ctx.errors_uncorrected = true;
	}

	traverse::check_root(&ctx)?;
	reachability::check_zones(&mut ctx, traverse::ROOT_INO);
	traverse::recursive_check(&mut ctx, traverse::ROOT_INO);
	reconcile::check_counts(&mut ctx);

	if ctx.flags.show {
		report::print_superblock_info(&ctx);
	}
	if ctx.flags.verbose {
		report::print_summary(&ctx);
	}

	writeback::flush(&mut ctx)?;

	Ok(Outcome::Checked {
		changed: ctx.changed,
		uncorrected: ctx.errors_uncorrected,
	})
}
