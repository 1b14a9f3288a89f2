//! Zone-reachability pass: walks every zone number an inode claims
//! (directly and through indirection) and tallies it in `zone_count`,
//! catching zones claimed twice and zones the bitmap doesn't think are in
//! use.

use crate::blockmap::check_zone_nr;
use crate::checker::Context;
use crate::superblock::Variant;
use crate::tables::{is_dir, is_lnk, is_reg};

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

/// Validates, counts and (if not already counted) marks in-use the zone
/// referenced by `slot`. Returns whether `slot` was mutated.
fn add_zone(ctx: &mut Context, slot: &mut u32) -> bool {
	let (mut block, mut corrected) = check_zone_nr(ctx, slot);
	if block == 0 {
		return corrected;
	}

	if ctx.tables.zone_count[block as usize] != 0 {
		println!(
			"Block has been used before. Now in file `{}'.",
			ctx.names.render()
		);
		if ctx.ask("Clear", true) {
			*slot = 0;
			block = 0;
			corrected = true;
		}
	}
	if block == 0 {
		return corrected;
	}

	let bit = ctx.sb.geometry.zone_bit(block);
	if !ctx.tables.zone_bitmap.bit(bit) {
		println!(
			"Block {block} in file `{}' is marked not in use.",
			ctx.names.render()
		);
		if ctx.ask("Correct", true) {
			ctx.tables.zone_bitmap.set(bit);
			ctx.changed = true;
		}
	}

	let count = &mut ctx.tables.zone_count[block as usize];
	*count = count.saturating_add(1);
	corrected
}

fn add_zone_ind(ctx: &mut Context, slot: &mut u32) -> bool {
	let corrected = add_zone(ctx, slot);
	let block = *slot;
	if block == 0 {
		return corrected;
	}
	let variant = ctx.sb.geometry.variant;
	let fanout = variant.indirect_fanout();
	let mut buf = ctx.read_zone_block(block);
	let mut blk_changed = false;
	for i in 0..fanout as usize {
		let mut val = entry_at(variant, &buf, i);
		if add_zone(ctx, &mut val) {
			set_entry_at(variant, &mut buf, i, val);
			blk_changed = true;
		}
	}
	if blk_changed {
		ctx.write_zone_block(block, &buf);
	}
	corrected
}

fn add_zone_dind(ctx: &mut Context, slot: &mut u32) -> bool {
	let corrected = add_zone(ctx, slot);
	let block = *slot;
	if block == 0 {
		return corrected;
	}
	let variant = ctx.sb.geometry.variant;
	let fanout = variant.indirect_fanout();
	let mut buf = ctx.read_zone_block(block);
	let mut blk_changed = false;
	for i in 0..fanout as usize {
		let mut val = entry_at(variant, &buf, i);
		if add_zone_ind(ctx, &mut val) {
			set_entry_at(variant, &mut buf, i, val);
			blk_changed = true;
		}
	}
	if blk_changed {
		ctx.write_zone_block(block, &buf);
	}
	corrected
}

fn add_zone_tind(ctx: &mut Context, slot: &mut u32) -> bool {
	let corrected = add_zone(ctx, slot);
	let block = *slot;
	if block == 0 {
		return corrected;
	}
	let variant = ctx.sb.geometry.variant;
	let fanout = variant.indirect_fanout();
	let mut buf = ctx.read_zone_block(block);
	let mut blk_changed = false;
	for i in 0..fanout as usize {
		let mut val = entry_at(variant, &buf, i);
		if add_zone_dind(ctx, &mut val) {
			set_entry_at(variant, &mut buf, i, val);
			blk_changed = true;
		}
	}
	if blk_changed {
		ctx.write_zone_block(block, &buf);
	}
	corrected
}

/// Walks every zone inode `ino` claims. Skipped entirely for inodes
/// already visited through a hard link (`inode_count > 1`) — the first
/// visit already tallied every zone it owns.
pub fn check_zones(ctx: &mut Context, ino: u32) {
	if ino == 0 || ino > ctx.sb.geometry.inodes {
		return;
	}
	if ctx.tables.inode_count[ino as usize] > 1 {
		return;
	}

	let inode = ctx.tables.inode_table.read(ino);
	if !(is_dir(inode.mode) || is_reg(inode.mode) || is_lnk(inode.mode)) {
		return;
	}

	let mut zones = inode.zones;
	let mut dirty = false;

	for zone in zones.iter_mut().take(7) {
		dirty |= add_zone(ctx, zone);
	}
	dirty |= add_zone_ind(ctx, &mut zones[7]);
	dirty |= add_zone_dind(ctx, &mut zones[8]);
	if ctx.sb.geometry.variant.has_triple_indirect() {
		dirty |= add_zone_tind(ctx, &mut zones[9]);
	}

	if dirty {
		ctx.tables.inode_table.write_zones(ino, &zones);
		ctx.changed = true;
	}
}
