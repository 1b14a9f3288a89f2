//! Final flush phase: superblock, inode bitmap, zone bitmap, inode table,
//! in that order. Indirect blocks corrected mid-traversal are
//! already on disk by the time this runs (`blockmap::resolve`,
//! `reachability::add_zone*` write those back inline).

use crate::checker::Context;
use crate::error::Result;

/// Flushes whatever needs flushing for this run and sets the superblock's
/// state flags to match the outcome.
///
/// - `changed`: superblock, then inode bitmap, zone bitmap, inode table.
/// - not `changed` but running with `-a`/`-r`: only the superblock is
///   rewritten, to record the state flags.
/// - otherwise: nothing is written.
pub fn flush(ctx: &mut Context) -> Result<()> {
	if !ctx.changed && !ctx.flags.repair {
		return Ok(());
	}

	ctx.sb.set_state(true, ctx.errors_uncorrected);
	ctx.sb.write(&mut ctx.dev)?;

	if !ctx.changed {
		return Ok(());
	}

	let g = ctx.sb.geometry;
	ctx.dev
		.write_at(g.inode_bitmap_offset(), ctx.tables.inode_bitmap.as_bytes())?;
	ctx.dev
		.write_at(g.zone_bitmap_offset(), ctx.tables.zone_bitmap.as_bytes())?;
	ctx.dev
		.write_at(g.inode_table_offset(), ctx.tables.inode_table.as_bytes())?;

	Ok(())
}
