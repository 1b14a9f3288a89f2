//! End-to-end scenarios: build a minimal Minix image
//! byte-for-byte, run the checker against it, and assert on the outcome and
//! the resulting bytes. Every image here uses stride 16 / namelen 14 (the
//! default magic, short names) and a single-block inode/zone bitmap.

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use minixck::checker;
use minixck::checker::Outcome;
use minixck::checker::RunFlags;
use minixck::operator::Automatic;
use minixck::operator::ReadOnly;

const BLOCK_SIZE: usize = minixck::BLOCK_SIZE;

const MAGIC_V1: u16 = 0x137F;
const MAGIC_V2: u16 = 0x2468;
const VALID_FS: u16 = 0x0001;
const ERROR_FS: u16 = 0x0002;

const S_IFDIR: u16 = 0o040000;
const S_IFREG: u16 = 0o100000;

/// A Minix image under construction: a flat byte buffer addressed in whole
/// 1024-byte blocks, the same layout `blockio.rs` reads positionally.
struct Image {
    buf: Vec<u8>,
}

impl Image {
    fn new(total_zones: u32) -> Self {
        Self {
            buf: vec![0u8; total_zones as usize * BLOCK_SIZE],
        }
    }

    fn block_mut(&mut self, nr: u32) -> &mut [u8] {
        let off = nr as usize * BLOCK_SIZE;
        &mut self.buf[off..off + BLOCK_SIZE]
    }

    fn write_super_v1(&mut self, ninodes: u16, nzones: u16, firstdatazone: u16, state: u16) {
        let sb = self.block_mut(1);
        sb[0..2].copy_from_slice(&ninodes.to_le_bytes());
        sb[2..4].copy_from_slice(&nzones.to_le_bytes());
        sb[4..6].copy_from_slice(&1u16.to_le_bytes()); // s_imap_blocks
        sb[6..8].copy_from_slice(&1u16.to_le_bytes()); // s_zmap_blocks
        sb[8..10].copy_from_slice(&firstdatazone.to_le_bytes());
        sb[10..12].copy_from_slice(&0u16.to_le_bytes()); // s_log_zone_size
        sb[12..16].copy_from_slice(&0u32.to_le_bytes()); // s_max_size
        sb[16..18].copy_from_slice(&MAGIC_V1.to_le_bytes());
        sb[18..20].copy_from_slice(&state.to_le_bytes());
    }

    fn write_super_v2(&mut self, ninodes: u16, nzones: u32, firstdatazone: u16, state: u16) {
        let sb = self.block_mut(1);
        sb[0..2].copy_from_slice(&ninodes.to_le_bytes());
        sb[2..4].copy_from_slice(&0u16.to_le_bytes()); // s_nzones unused by v2 readers
        sb[4..6].copy_from_slice(&1u16.to_le_bytes());
        sb[6..8].copy_from_slice(&1u16.to_le_bytes());
        sb[8..10].copy_from_slice(&firstdatazone.to_le_bytes());
        sb[10..12].copy_from_slice(&0u16.to_le_bytes());
        sb[12..16].copy_from_slice(&0u32.to_le_bytes());
        sb[16..18].copy_from_slice(&MAGIC_V2.to_le_bytes());
        sb[18..20].copy_from_slice(&state.to_le_bytes());
        sb[20..24].copy_from_slice(&nzones.to_le_bytes());
    }

    fn set_inode_bit(&mut self, i: u32) {
        let block = self.block_mut(2);
        block[i as usize / 8] |= 1 << (i % 8);
    }

    fn set_zone_bit(&mut self, bit: u32) {
        let block = self.block_mut(3);
        block[bit as usize / 8] |= 1 << (bit % 8);
    }

    /// Writes a v1 inode (32 bytes) at 1-based slot `nr` in the inode table
    /// (block 4, one block holding all 32 inodes of these fixtures).
    fn write_inode_v1(&mut self, nr: u32, mode: u16, nlinks: u8, size: u32, zones: &[u16]) {
        let table = self.block_mut(4);
        let off = (nr as usize - 1) * 32;
        table[off..off + 2].copy_from_slice(&mode.to_le_bytes());
        table[off + 2..off + 4].copy_from_slice(&0u16.to_le_bytes()); // uid
        table[off + 4..off + 8].copy_from_slice(&size.to_le_bytes());
        table[off + 8..off + 12].copy_from_slice(&0u32.to_le_bytes()); // mtime
        table[off + 12] = 0; // gid
        table[off + 13] = nlinks;
        for (i, z) in zones.iter().enumerate() {
            let zoff = off + 14 + i * 2;
            table[zoff..zoff + 2].copy_from_slice(&z.to_le_bytes());
        }
    }

    /// Writes a v2 inode (64 bytes) at 1-based slot `nr` in the inode table.
    /// These fixtures' 32 v2 inodes (64 bytes each = 2048 bytes) span
    /// blocks 4 and 5.
    fn write_inode_v2(&mut self, nr: u32, mode: u16, nlinks: u16, size: u32, zones: &[u32]) {
        let inode_size = 64usize;
        let idx = nr as usize - 1;
        let block_nr = 4 + (idx * inode_size) / BLOCK_SIZE;
        let off_in_block = (idx * inode_size) % BLOCK_SIZE;
        let table = self.block_mut(block_nr as u32);
        table[off_in_block..off_in_block + 2].copy_from_slice(&mode.to_le_bytes());
        table[off_in_block + 2..off_in_block + 4].copy_from_slice(&nlinks.to_le_bytes());
        table[off_in_block + 4..off_in_block + 6].copy_from_slice(&0u16.to_le_bytes());
        table[off_in_block + 6..off_in_block + 8].copy_from_slice(&0u16.to_le_bytes());
        table[off_in_block + 8..off_in_block + 12].copy_from_slice(&size.to_le_bytes());
        for (i, z) in zones.iter().enumerate() {
            let zoff = off_in_block + 24 + i * 4;
            table[zoff..zoff + 4].copy_from_slice(&z.to_le_bytes());
        }
    }

    /// Writes a directory entry (stride 16, namelen 14) at `entry_idx`
    /// within zone `zone`.
    fn write_dirent(&mut self, zone: u32, entry_idx: u32, ino: u16, name: &str) {
        let block = self.block_mut(zone);
        let off = entry_idx as usize * 16;
        block[off..off + 2].copy_from_slice(&ino.to_le_bytes());
        let name_bytes = name.as_bytes();
        block[off + 2..off + 2 + name_bytes.len()].copy_from_slice(name_bytes);
    }

    fn save(&self, path: &Path) {
        let mut f = File::create(path).unwrap();
        f.write_all(&self.buf).unwrap();
    }
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("minixck-test-{name}-{}.img", std::process::id()))
}

/// A minimal, already-consistent v1 image: root directory (inode 1, zone 5)
/// containing only `.` and `..`, 32 inodes, 20 zones.
fn clean_v1_image() -> Image {
    let mut img = Image::new(20);
    img.write_super_v1(32, 20, 5, 0);
    img.set_inode_bit(0); // sentinel
    img.set_inode_bit(1); // root in use
    img.set_zone_bit(0); // sentinel
    img.set_zone_bit(1); // zone 5 -> bit (5-5+1)=1
    img.write_inode_v1(1, S_IFDIR | 0o755, 2, 32, &[5, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_dirent(5, 0, 1, ".");
    img.write_dirent(5, 1, 1, "..");
    img
}

#[test]
fn s1_clean_v1_no_writes() {
    let path = scratch_path("s1");
    clean_v1_image().save(&path);
    let before = fs::read(&path).unwrap();

    let outcome = checker::run(&path, Box::new(ReadOnly), RunFlags::default()).unwrap();
    let Outcome::Checked {
        changed,
        uncorrected,
    } = outcome
    else {
        panic!("expected a full check, image wasn't pre-marked clean");
    };
    assert!(!changed);
    assert!(!uncorrected);

    let after = fs::read(&path).unwrap();
    assert_eq!(before, after, "read-only run must not touch the image");

    fs::remove_file(&path).ok();
}

#[test]
fn s2_force_clean_v2_rewrites_state() {
    let path = scratch_path("s2");
    let mut img = Image::new(20);
    // v2: inode_size 64, inodes_per_block 16, inode_blocks = ceil(32/16) = 2
    // -> firstdatazone = 2 + 1 + 1 + 2 = 6.
    img.write_super_v2(32, 20, 6, VALID_FS);
    img.set_inode_bit(0);
    img.set_inode_bit(1);
    img.set_zone_bit(0);
    img.set_zone_bit(1); // zone 6 -> bit (6-6+1)=1
    img.write_inode_v2(1, S_IFDIR | 0o755, 2, 32, &[6]);
    img.write_dirent(6, 0, 1, ".");
    img.write_dirent(6, 1, 1, "..");
    img.save(&path);

    let mut flags = RunFlags::default();
    flags.force = true;
    flags.repair = true; // -a, so writeback normalizes s_state even though nothing changed
    let outcome = checker::run(&path, Box::new(Automatic), flags).unwrap();
    let Outcome::Checked {
        changed,
        uncorrected,
    } = outcome
    else {
        panic!("-f must force a full check even on a clean image");
    };
    assert!(!changed);
    assert!(!uncorrected);

    let after = fs::read(&path).unwrap();
    let state = u16::from_le_bytes([after[BLOCK_SIZE + 18], after[BLOCK_SIZE + 19]]);
    assert_eq!(state & VALID_FS, VALID_FS);
    assert_eq!(state & ERROR_FS, 0);

    fs::remove_file(&path).ok();
}

#[test]
fn s3_dangling_link_is_zeroed_under_automatic_repair() {
    let path = scratch_path("s3");
    let mut img = clean_v1_image();
    // Root directory grows a third entry pointing at an out-of-range inode.
    img.write_inode_v1(1, S_IFDIR | 0o755, 2, 48, &[5, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_dirent(5, 2, 9999, "ghost");
    img.save(&path);

    let mut flags = RunFlags::default();
    flags.repair = true;
    let outcome = checker::run(&path, Box::new(Automatic), flags).unwrap();
    let Outcome::Checked {
        changed,
        uncorrected,
    } = outcome
    else {
        panic!("image wasn't pre-marked clean");
    };
    assert!(changed);
    assert!(!uncorrected);

    let after = fs::read(&path).unwrap();
    let entry_off = BLOCK_SIZE * 5 + 2 * 16;
    let ino = u16::from_le_bytes([after[entry_off], after[entry_off + 1]]);
    assert_eq!(ino, 0, "dangling entry must be zeroed");

    fs::remove_file(&path).ok();
}

#[test]
fn s4_double_booked_zone_second_reference_cleared() {
    let path = scratch_path("s4");
    let mut img = clean_v1_image();
    // Two regular files, inode 2 and inode 3, both claim zone 10 directly.
    img.set_inode_bit(2);
    img.set_inode_bit(3);
    img.write_inode_v1(2, S_IFREG | 0o644, 1, 4, &[10, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_inode_v1(3, S_IFREG | 0o644, 1, 4, &[10, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_inode_v1(1, S_IFDIR | 0o755, 2, 64, &[5, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_dirent(5, 2, 2, "a");
    img.write_dirent(5, 3, 3, "b");
    img.save(&path);

    let mut flags = RunFlags::default();
    flags.repair = true;
    let outcome = checker::run(&path, Box::new(Automatic), flags).unwrap();
    let Outcome::Checked { changed, .. } = outcome else {
        panic!("image wasn't pre-marked clean");
    };
    assert!(changed);

    // Re-run read-only: exactly one of the two inodes should still claim
    // zone 10 (idempotence: the second run finds nothing left to fix).
    let outcome2 = checker::run(&path, Box::new(ReadOnly), RunFlags::default()).unwrap();
    let Outcome::Checked {
        changed: changed2,
        uncorrected: uncorrected2,
    } = outcome2
    else {
        panic!("image wasn't pre-marked clean");
    };
    assert!(!changed2);
    assert!(!uncorrected2);

    fs::remove_file(&path).ok();
}

#[test]
fn s5_wrong_link_count_is_rewritten() {
    let path = scratch_path("s5");
    let mut img = clean_v1_image();
    img.set_inode_bit(2);
    // i_nlinks claims 3 but only one directory entry references inode 2.
    img.write_inode_v1(2, S_IFREG | 0o644, 3, 4, &[10, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_inode_v1(1, S_IFDIR | 0o755, 2, 48, &[5, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_dirent(5, 2, 2, "a");
    img.save(&path);

    let mut flags = RunFlags::default();
    flags.repair = true;
    let outcome = checker::run(&path, Box::new(Automatic), flags).unwrap();
    let Outcome::Checked {
        changed,
        uncorrected,
    } = outcome
    else {
        panic!("image wasn't pre-marked clean");
    };
    assert!(changed);
    assert!(!uncorrected);

    let after = fs::read(&path).unwrap();
    let inode_off = BLOCK_SIZE * 4 + 32; // inode 2's slot
    let nlinks = after[inode_off + 13];
    assert_eq!(nlinks, 1);

    fs::remove_file(&path).ok();
}

#[test]
fn s6_read_only_makes_no_writes_and_flags_uncorrected() {
    let path = scratch_path("s6");
    let mut img = clean_v1_image();
    img.write_inode_v1(1, S_IFDIR | 0o755, 2, 48, &[5, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_dirent(5, 2, 9999, "ghost");
    img.save(&path);
    let before = fs::read(&path).unwrap();

    let outcome = checker::run(&path, Box::new(ReadOnly), RunFlags::default()).unwrap();
    let Outcome::Checked {
        changed,
        uncorrected,
    } = outcome
    else {
        panic!("image wasn't pre-marked clean");
    };
    assert!(!changed);
    assert!(uncorrected);

    let after = fs::read(&path).unwrap();
    assert_eq!(before, after, "read-only run must not touch the image");

    fs::remove_file(&path).ok();
}

#[test]
fn idempotence_second_pass_changes_nothing() {
    let path = scratch_path("idempotence");
    let mut img = clean_v1_image();
    img.write_inode_v1(1, S_IFDIR | 0o755, 2, 48, &[5, 0, 0, 0, 0, 0, 0, 0, 0]);
    img.write_dirent(5, 2, 9999, "ghost");
    img.save(&path);

    let mut flags = RunFlags::default();
    flags.repair = true;
    checker::run(&path, Box::new(Automatic), flags).unwrap();
    let second = checker::run(&path, Box::new(Automatic), flags).unwrap();
    let Outcome::Checked { changed, .. } = second else {
        panic!("image wasn't pre-marked clean");
    };
    assert!(!changed, "a second pass must find nothing left to repair");

    fs::remove_file(&path).ok();
}
