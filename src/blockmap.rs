//! Resolves a logical block index within a file to a physical zone
//! number, walking direct, single, double and (v2 only) triple
//! indirection, validating every stored zone number it passes through
//! along the way.

use crate::checker::Context;
use crate::superblock::Variant;

/// Validates a stored zone number in place. Returns the zone number to
/// use (0 for a hole or a rejected value) and whether `slot` was mutated
/// (the caller must then persist whatever block or inode `slot` lives
/// in). An invalid zone number is always *used* as 0 this run; the slot
/// itself is only zeroed on disk if the operator agrees to the repair.
pub fn check_zone_nr(ctx: &mut Context, slot: &mut u32) -> (u32, bool) {
	let nr = *slot;
	if nr == 0 {
		return (0, false);
	}
	let g = ctx.sb.geometry;
	if nr >= g.firstdatazone && nr < g.zones {
		return (nr, false);
	}

	if nr < g.firstdatazone {
		println!("Zone nr < FIRSTZONE in file `{}'.", ctx.names.render());
	} else {
		println!("Zone nr >= ZONES in file `{}'.", ctx.names.render());
	}
	if ctx.ask("Remove block", true) {
		*slot = 0;
		(0, true)
	} else {
		(0, false)
	}
}

fn entry_at(variant: Variant, buf: &[u8], idx: usize) -> u32 {
	match variant {
		Variant::V1 => u16::from_le_bytes([buf[idx * 2], buf[idx * 2 + 1]]) as u32,
		Variant::V2 => u32::from_le_bytes(buf[idx * 4..idx * 4 + 4].try_into().unwrap()),
	}
}

fn set_entry_at(variant: Variant, buf: &mut [u8], idx: usize, val: u32) {
	match variant {
		Variant::V1 => buf[idx * 2..idx * 2 + 2].copy_from_slice(&(val as u16).to_le_bytes()),
		Variant::V2 => buf[idx * 4..idx * 4 + 4].copy_from_slice(&val.to_le_bytes()),
	}
}

fn read_zone_entry(ctx: &mut Context, buf: &mut [u8], idx: usize, blk_changed: &mut bool) -> u32 {
	let variant = ctx.sb.geometry.variant;
	if idx >= variant.indirect_fanout() as usize {
		println!("Zone nr out of range in file `{}'.", ctx.names.render());
		ctx.errors_uncorrected = true;
		return 0;
	}
	let mut val = entry_at(variant, buf, idx);
	let (z, changed) = check_zone_nr(ctx, &mut val);
	if changed {
		set_entry_at(variant, buf, idx, val);
		*blk_changed = true;
	}
	z
}

fn resolve_indirect(ctx: &mut Context, block: u32, idx: u32) -> u32 {
	let mut buf = ctx.read_zone_block(block);
	let mut blk_changed = false;
	let z = read_zone_entry(ctx, &mut buf, idx as usize, &mut blk_changed);
	if blk_changed {
		ctx.write_zone_block(block, &buf);
	}
	z
}

fn resolve_double_indirect(ctx: &mut Context, block: u32, idx: u32) -> u32 {
	let fanout = ctx.sb.geometry.variant.indirect_fanout();
	let mut buf = ctx.read_zone_block(block);
	let mut blk_changed = false;
	let sind = read_zone_entry(ctx, &mut buf, (idx / fanout) as usize, &mut blk_changed);
	if blk_changed {
		ctx.write_zone_block(block, &buf);
	}
	resolve_indirect(ctx, sind, idx % fanout)
}

fn resolve_triple_indirect(ctx: &mut Context, block: u32, idx: u32) -> u32 {
	let fanout = ctx.sb.geometry.variant.indirect_fanout();
	let mut buf = ctx.read_zone_block(block);
	let mut blk_changed = false;
	let dind = read_zone_entry(
		ctx,
		&mut buf,
		(idx / (fanout * fanout)) as usize,
		&mut blk_changed,
	);
	if blk_changed {
		ctx.write_zone_block(block, &buf);
	}
	resolve_double_indirect(ctx, dind, idx % (fanout * fanout))
}

/// Resolves logical block `n` of inode `ino` to a physical zone number
/// (0 if it's a hole). Any indirect block touched along the way that had
/// a bad zone number cleared is written back immediately; the inode's own
/// zone slots are only marked dirty on `ctx.changed` and flushed with the
/// rest of the inode table at the end of the run.
pub fn resolve(ctx: &mut Context, ino: u32, mut n: u32) -> u32 {
	let variant = ctx.sb.geometry.variant;
	let fanout = variant.indirect_fanout();
	let mut inode = ctx.tables.inode_table.read(ino);
	let mut dirty = false;

	let result = if n < 7 {
		let (z, chg) = check_zone_nr(ctx, &mut inode.zones[n as usize]);
		dirty |= chg;
		z
	} else {
		n -= 7;
		if n < fanout {
			let (blk, chg) = check_zone_nr(ctx, &mut inode.zones[7]);
			dirty |= chg;
			resolve_indirect(ctx, blk, n)
		} else {
			n -= fanout;
			let double_range = fanout * fanout;
			if n < double_range {
				let (blk, chg) = check_zone_nr(ctx, &mut inode.zones[8]);
				dirty |= chg;
				resolve_double_indirect(ctx, blk, n)
			} else if variant.has_triple_indirect() {
				n -= double_range;
				let (blk, chg) = check_zone_nr(ctx, &mut inode.zones[9]);
				dirty |= chg;
				resolve_triple_indirect(ctx, blk, n)
			} else {
				println!("Zone nr out of range in file `{}'.", ctx.names.render());
				ctx.errors_uncorrected = true;
				0
			}
		}
	};

	if dirty {
		ctx.tables.inode_table.write_zones(ino, &inode.zones);
		ctx.changed = true;
	}
	result
}
