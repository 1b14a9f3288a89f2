//! Reconciliation: compares what the traversal actually observed
//! (`inode_count`, `zone_count`) against what the bitmaps and inode
//! records claim, and offers to fix up whichever one disagrees.

use crate::checker::Context;

/// Probes whether a zone believed free actually looks readable before
/// offering to clear its bitmap bit; an I/O error here is treated as
/// "probably on a bad-block list already" and skipped silently rather
/// than flagged.
fn bad_zone(ctx: &mut Context, zone: u32) -> bool {
	!ctx.dev.probe_block(zone)
}

pub fn check_counts(ctx: &mut Context) {
	let inodes = ctx.sb.geometry.inodes;
	for i in 1..=inodes {
		let idx = i as usize;
		let inode = ctx.tables.inode_table.read(i);

		if ctx.flags.warn_mode && inode.mode != 0 && !ctx.tables.inode_bitmap.bit(idx) {
			println!("Inode {i} mode not cleared.");
			if ctx.ask("Clear", true) {
				ctx.tables.inode_table.write_mode(i, 0);
				ctx.changed = true;
			}
		}

		if ctx.tables.inode_count[idx] == 0 {
			if !ctx.tables.inode_bitmap.bit(idx) {
				continue;
			}
			println!("Inode {i} not used, marked used in the bitmap.");
			if ctx.ask("Clear", true) {
				ctx.tables.inode_bitmap.clear(idx);
				ctx.changed = true;
			}
			continue;
		}

		if !ctx.tables.inode_bitmap.bit(idx) {
			println!("Inode {i} used, marked unused in the bitmap.");
			if ctx.ask("Set", true) {
				ctx.tables.inode_bitmap.set(idx);
				ctx.changed = true;
			}
		}

		if inode.nlinks != ctx.tables.inode_count[idx] as u16 {
			println!(
				"Inode {i} (mode = {:07o}): ino_nlinks={}, counted={}.",
				inode.mode, inode.nlinks, ctx.tables.inode_count[idx]
			);
			if ctx.ask("Set i_nlinks to count", true) {
				ctx.tables
					.inode_table
					.write_nlinks(i, ctx.tables.inode_count[idx] as u16);
				ctx.changed = true;
			}
		}
	}

	let (firstdatazone, zones) = (ctx.sb.geometry.firstdatazone, ctx.sb.geometry.zones);
	for zone in firstdatazone..zones {
		let bit = ctx.sb.geometry.zone_bit(zone);
		let in_use = ctx.tables.zone_bitmap.bit(bit);
		let counted = ctx.tables.zone_count[zone as usize] != 0;
		if in_use == counted {
			continue;
		}

		if !counted {
			if bad_zone(ctx, zone) {
				continue;
			}
			println!("Zone {zone}: marked in use, no file uses it.");
			if ctx.ask("Unmark", true) {
				ctx.tables.zone_bitmap.clear(bit);
				ctx.changed = true;
			}
			continue;
		}

		if in_use {
			println!(
				"Zone {zone}: in use, counted={}",
				ctx.tables.zone_count[zone as usize]
			);
		} else {
			println!(
				"Zone {zone}: not in use, counted={}",
				ctx.tables.zone_count[zone as usize]
			);
		}
		ctx.errors_uncorrected = true;
	}
}
