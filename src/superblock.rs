//! Superblock parsing, geometry derivation and write-back.
//!
//! The raw layouts below are laid out exactly as they sit on disk and
//! reinterpreted through a packed struct covering the full block, trailing
//! reserved bytes included, so a read-modify-write round-trips anything we
//! don't understand byte-for-byte.

use crate::blockio::BlockDevice;
use crate::error::CheckError;
use crate::error::Result;
use crate::BLOCK_SIZE;

const MAGIC_V1: u16 = 0x137F;
const MAGIC_V1_30CHAR: u16 = 0x138F;
const MAGIC_V2: u16 = 0x2468;
const MAGIC_V2_30CHAR: u16 = 0x2478;

const VALID_FS: u16 = 0x0001;
const ERROR_FS: u16 = 0x0002;

const SUPERBLOCK_OFFSET: u64 = BLOCK_SIZE as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
	V1,
	V2,
}

impl Variant {
	/// On-disk size of one inode record.
	pub fn inode_size(self) -> usize {
		match self {
			Self::V1 => 32,
			Self::V2 => 64,
		}
	}

	/// Number of zone-number slots carried directly in the inode: 7 direct
	/// + single + double (+ triple for v2).
	pub fn zone_slots(self) -> usize {
		match self {
			Self::V1 => 9,
			Self::V2 => 10,
		}
	}

	pub fn has_triple_indirect(self) -> bool {
		matches!(self, Self::V2)
	}

	/// Zone numbers per indirect block: 512 two-byte entries for v1, 256
	/// four-byte entries for v2.
	pub fn indirect_fanout(self) -> u32 {
		match self {
			Self::V1 => (BLOCK_SIZE / 2) as u32,
			Self::V2 => (BLOCK_SIZE / 4) as u32,
		}
	}

	fn long_names(self, magic: u16) -> bool {
		matches!(magic, MAGIC_V1_30CHAR | MAGIC_V2_30CHAR)
	}
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct RawSuperblockV1 {
	s_ninodes: u16,
	s_nzones: u16,
	s_imap_blocks: u16,
	s_zmap_blocks: u16,
	s_firstdatazone: u16,
	s_log_zone_size: u16,
	s_max_size: u32,
	s_magic: u16,
	s_state: u16,
	_reserved: [u8; BLOCK_SIZE - 20],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct RawSuperblockV2 {
	s_ninodes: u16,
	s_nzones: u16,
	s_imap_blocks: u16,
	s_zmap_blocks: u16,
	s_firstdatazone: u16,
	s_log_zone_size: u16,
	s_max_size: u32,
	s_magic: u16,
	s_state: u16,
	s_zones: u32,
	_reserved: [u8; BLOCK_SIZE - 24],
}

/// Geometry derived from the superblock. `stride`/`namelen` start out at
/// the magic-implied default and are refined once the directory-entry
/// probe in `tables.rs` has looked at the root directory.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
	pub variant: Variant,
	pub inodes: u32,
	pub zones: u32,
	pub imap_blocks: u32,
	pub zmap_blocks: u32,
	pub firstdatazone: u32,
	pub norm_firstdatazone: u32,
	pub log_zone_size: u16,
	pub max_size: u32,
	pub stride: u16,
	pub namelen: u16,
	pub inode_size: u32,
	pub inodes_per_block: u32,
	pub inode_blocks: u32,
	/// Set when `firstdatazone` doesn't sit where the bitmap/inode-table
	/// sizes predict. Kept as data here; `checker::run` decides what to do
	/// with it once a `Context` (and the clean-gate) exist.
	pub firstzone_mismatch: bool,
}

impl Geometry {
	pub fn zone_bit(&self, zone: u32) -> usize {
		(zone - self.firstdatazone + 1) as usize
	}

	pub fn inode_bitmap_offset(&self) -> u64 {
		2 * BLOCK_SIZE as u64
	}

	pub fn zone_bitmap_offset(&self) -> u64 {
		self.inode_bitmap_offset() + self.imap_blocks as u64 * BLOCK_SIZE as u64
	}

	pub fn inode_table_offset(&self) -> u64 {
		self.zone_bitmap_offset() + self.zmap_blocks as u64 * BLOCK_SIZE as u64
	}
}

pub struct Superblock {
	raw: Vec<u8>,
	pub geometry: Geometry,
}

impl Superblock {
	pub fn read(dev: &mut BlockDevice) -> Result<Self> {
		let mut raw = vec![0u8; BLOCK_SIZE];
		dev.read_at(SUPERBLOCK_OFFSET, &mut raw)?;

		let magic = u16::from_le_bytes([raw[16], raw[17]]);
		let variant = match magic {
			MAGIC_V1 | MAGIC_V1_30CHAR => Variant::V1,
			MAGIC_V2 | MAGIC_V2_30CHAR => Variant::V2,
			other => {
				return Err(CheckError::Corrupt(format!(
					"bad magic number in super-block (0x{other:04x})"
				)))
			}
		};
		let (stride, namelen): (u16, u16) = if variant.long_names(magic) {
			(32, 30)
		} else {
			(16, 14)
		};

		let (ninodes, nzones, imap_blocks, zmap_blocks, firstdatazone, log_zone_size, max_size) =
			match variant {
				Variant::V1 => {
					let sb = unsafe { &*(raw.as_ptr() as *const RawSuperblockV1) };
					(
						sb.s_ninodes,
						sb.s_nzones as u32,
						sb.s_imap_blocks,
						sb.s_zmap_blocks,
						sb.s_firstdatazone,
						sb.s_log_zone_size,
						sb.s_max_size,
					)
				}
				Variant::V2 => {
					let sb = unsafe { &*(raw.as_ptr() as *const RawSuperblockV2) };
					(
						sb.s_ninodes,
						sb.s_zones,
						sb.s_imap_blocks,
						sb.s_zmap_blocks,
						sb.s_firstdatazone,
						sb.s_log_zone_size,
						sb.s_max_size,
					)
				}
			};

		if log_zone_size != 0 {
			return Err(CheckError::Corrupt(
				"zone size != block size not supported".into(),
			));
		}

		let inodes = ninodes as u32;
		let zones = nzones;
		let imap_blocks = imap_blocks as u32;
		let zmap_blocks = zmap_blocks as u32;
		let firstdatazone = firstdatazone as u32;

		if (imap_blocks as u64) * BLOCK_SIZE as u64 * 8 < inodes as u64 + 1 {
			return Err(CheckError::Corrupt(
				"bad s_imap_blocks field in super-block".into(),
			));
		}
		if zones < firstdatazone
			|| (zmap_blocks as u64) * BLOCK_SIZE as u64 * 8 < (zones - firstdatazone) as u64 + 1
		{
			return Err(CheckError::Corrupt(
				"bad s_zmap_blocks field in super-block".into(),
			));
		}

		let inode_size = variant.inode_size() as u32;
		let inodes_per_block = BLOCK_SIZE as u32 / inode_size;
		let inode_blocks = (inodes + inodes_per_block - 1) / inodes_per_block.max(1);
		let norm_firstdatazone = 2 + imap_blocks + zmap_blocks + inode_blocks;
		let firstzone_mismatch = norm_firstdatazone != firstdatazone;

		Ok(Self {
			raw,
			geometry: Geometry {
				variant,
				inodes,
				zones,
				imap_blocks,
				zmap_blocks,
				firstdatazone,
				norm_firstdatazone,
				log_zone_size,
				max_size,
				stride,
				namelen,
				inode_size,
				inodes_per_block,
				inode_blocks,
				firstzone_mismatch,
			},
		})
	}

	fn state_offset(&self) -> usize {
		18
	}

	pub fn state(&self) -> u16 {
		let off = self.state_offset();
		u16::from_le_bytes([self.raw[off], self.raw[off + 1]])
	}

	pub fn is_clean(&self) -> bool {
		let state = self.state();
		state & VALID_FS != 0 && state & ERROR_FS == 0
	}

	/// Sets `VALID_FS`, and `ERROR_FS` according to whether the run ended
	/// with anything left uncorrected.
	pub fn set_state(&mut self, valid: bool, has_errors: bool) {
		let mut state = self.state();
		state = if valid { state | VALID_FS } else { state & !VALID_FS };
		state = if has_errors {
			state | ERROR_FS
		} else {
			state & !ERROR_FS
		};
		let off = self.state_offset();
		self.raw[off..off + 2].copy_from_slice(&state.to_le_bytes());
	}

	pub fn write(&self, dev: &mut BlockDevice) -> Result<()> {
		dev.write_at(SUPERBLOCK_OFFSET, &self.raw)?;
		Ok(())
	}
}
