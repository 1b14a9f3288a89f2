//! Human-readable reporting: the `-s` superblock dump and the `-v` final
//! statistics block. Neither is part of the core's consistency logic — the
//! counters themselves (`Stats`) are filled in by `traverse::get_inode` as a
//! side effect of the traversal every run performs regardless of these
//! flags; this module only decides whether and how to print them.

use crate::checker::Context;
use crate::superblock::Variant;

pub fn print_superblock_info(ctx: &Context) {
	let g = ctx.sb.geometry;
	println!(
		"{} inodes",
		g.inodes
	);
	println!("{} blocks", g.zones);
	println!("Firstdatazone={} ({})", g.firstdatazone, g.norm_firstdatazone);
	println!("Zonesize={}", crate::BLOCK_SIZE << g.log_zone_size);
	println!("Maxsize={}", g.max_size);
	println!(
		"Filesystem state: {}",
		if ctx.sb.is_clean() { "clean" } else { "not clean" }
	);
	println!(
		"namelen={} ({})",
		g.namelen,
		match g.variant {
			Variant::V1 => "v1",
			Variant::V2 => "v2",
		}
	);
}

pub fn print_summary(ctx: &Context) {
	let s = &ctx.stats;
	let g = ctx.sb.geometry;

	let used_inodes = (1..=g.inodes as usize)
		.filter(|&i| ctx.tables.inode_bitmap.bit(i))
		.count();
	let total_zones = g.zones.saturating_sub(g.firstdatazone);
	let used_zones = (1..=total_zones as usize)
		.filter(|&i| ctx.tables.zone_bitmap.bit(i))
		.count();

	println!(
		"{:6} inodes used ({:.2}%)",
		used_inodes,
		100.0 * used_inodes as f64 / g.inodes.max(1) as f64
	);
	println!(
		"{:6} zones used ({:.2}%)",
		used_zones,
		100.0 * used_zones as f64 / total_zones.max(1) as f64
	);

	// get_inode counts `.` and `..` as ordinary references, so every
	// directory inflates links/total by two self/parent hits; undo that.
	let links = s.links as i64 - 2 * s.directory as i64 + 1;
	let total = s.total as i64 - 2 * s.directory as i64 + 1;

	println!(
		"{:6} regular files\n\
		 {:6} directories\n\
		 {:6} character device files\n\
		 {:6} block device files\n\
		 {:6} links\n\
		 {:6} symbolic links\n\
		 ------\n\
		 {:6} files",
		s.regular, s.directory, s.chardev, s.blockdev, links, s.symlinks, total
	);
}
