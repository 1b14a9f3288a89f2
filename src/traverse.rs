//! Directory traversal: walks the tree from the root inode, decoding
//! every directory entry, fetching and classifying the inode it points
//! at, and recursing into subdirectories.

use crate::blockmap;
use crate::checker::Context;
use crate::dirent;
use crate::error::CheckError;
use crate::error::Result;
use crate::reachability;
use crate::tables::classify;
use crate::tables::is_dir;
use crate::tables::Inode;
use crate::tables::ModeKind;
use crate::BLOCK_SIZE;

pub const ROOT_INO: u32 = 1;

/// The root inode must exist and be a directory; anything else makes the
/// image impossible to check at all.
pub fn check_root(ctx: &Context) -> Result<()> {
	let root = ctx.tables.inode_table.read(ROOT_INO);
	if !is_dir(root.mode) {
		return Err(CheckError::Corrupt(
			"root inode is not a directory".into(),
		));
	}
	Ok(())
}

/// Fetches inode `nr`, tallying it into the running statistics the first
/// time it's seen and counting every subsequent reference as a link.
/// Returns `None` for a null or out-of-range inode number.
fn get_inode(ctx: &mut Context, nr: u32) -> Option<Inode> {
	if nr == 0 || nr > ctx.sb.geometry.inodes {
		return None;
	}
	ctx.stats.total += 1;
	let inode = ctx.tables.inode_table.read(nr);
	let idx = nr as usize;

	if ctx.tables.inode_count[idx] == 0 {
		if !ctx.tables.inode_bitmap.bit(idx) {
			println!(
				"Inode {nr} marked unused, but used for file `{}'",
				ctx.names.render()
			);
			if ctx.ask("Mark in use", true) {
				ctx.tables.inode_bitmap.set(idx);
				ctx.changed = true;
			}
		}
		match classify(inode.mode) {
			ModeKind::Dir => ctx.stats.directory += 1,
			ModeKind::Reg => ctx.stats.regular += 1,
			ModeKind::Chr => ctx.stats.chardev += 1,
			ModeKind::Blk => ctx.stats.blockdev += 1,
			ModeKind::Lnk => ctx.stats.symlinks += 1,
			ModeKind::Sock | ModeKind::Fifo => {}
			ModeKind::Other => {
				println!(
					"The file `{}' has mode {:05o}.",
					ctx.names.render(),
					inode.mode
				);
				ctx.errors_uncorrected = true;
			}
		}
	} else {
		ctx.stats.links += 1;
	}

	if ctx.tables.inode_count[idx] == 255 {
		println!("Warning: inode count too big.");
		ctx.errors_uncorrected = true;
	} else {
		ctx.tables.inode_count[idx] += 1;
	}

	Some(inode)
}

fn check_file(ctx: &mut Context, dir_ino: u32, offset: u32) {
	let stride = ctx.sb.geometry.stride as u32;
	let namelen = ctx.sb.geometry.namelen;

	let logical_block = offset / BLOCK_SIZE as u32;
	let in_block = (offset % BLOCK_SIZE as u32) as usize;
	let block = blockmap::resolve(ctx, dir_ino, logical_block);
	let mut buf = ctx.read_zone_block(block);

	let (mut ino, name) = dirent::decode(&buf, in_block, namelen);
	if ino as u32 > ctx.sb.geometry.inodes {
		println!(
			"The directory `{}' contains a bad inode number for file `{name}'.",
			ctx.names.render()
		);
		if ctx.ask(" Remove", true) {
			dirent::zero_ino(&mut buf, in_block);
			ctx.write_zone_block(block, &buf);
			ctx.changed = true;
			ino = 0;
		}
	}

	ctx.names.push(&name);
	let inode = get_inode(ctx, ino as u32);

	if offset == 0 {
		if inode.is_none() || name != "." {
			println!("{}: bad directory: '.' isn't first", ctx.names.render());
			ctx.errors_uncorrected = true;
		}
		ctx.names.pop();
		return;
	}
	if offset == stride {
		if inode.is_none() || name != ".." {
			println!("{}: bad directory: '..' isn't second", ctx.names.render());
			ctx.errors_uncorrected = true;
		}
		ctx.names.pop();
		return;
	}

	let Some(inode) = inode else {
		ctx.names.pop();
		return;
	};

	if ctx.flags.list {
		if ctx.flags.verbose {
			print!("{:6} {:07o} {:3} ", ino, inode.mode, inode.nlinks);
		}
		print!("{}", ctx.names.render());
		println!("{}", if is_dir(inode.mode) { ":" } else { "" });
	}

	reachability::check_zones(ctx, ino as u32);
	if is_dir(inode.mode) {
		recursive_check(ctx, ino as u32);
	}
	ctx.names.pop();
}

/// Walks every directory entry of `ino`, two entries (`.` and `..`) plus
/// whatever else the directory holds.
pub fn recursive_check(ctx: &mut Context, ino: u32) {
	let inode = ctx.tables.inode_table.read(ino);
	let stride = ctx.sb.geometry.stride as u32;

	if inode.size < 2 * stride {
		println!(
			"{}: bad directory: size < {}",
			ctx.names.render(),
			2 * stride
		);
		ctx.errors_uncorrected = true;
	}

	let mut offset = 0u32;
	while offset < inode.size {
		check_file(ctx, ino, offset);
		offset += stride;
	}
}
