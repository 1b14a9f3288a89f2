//! Core consistency-checker engine for Minix v1/v2 filesystem images.
//!
//! `main.rs` is a thin CLI wrapper around [`checker::run`]; everything that
//! actually parses, walks and repairs an image lives in this crate so it can
//! be driven directly from integration tests without going through a
//! subprocess.

pub mod bitmap;
pub mod blockio;
pub mod blockmap;
pub mod checker;
pub mod dirent;
pub mod error;
pub mod mount;
pub mod operator;
pub mod reachability;
pub mod reconcile;
pub mod report;
pub mod superblock;
pub mod tables;
pub mod traverse;
pub mod writeback;

/// Fixed block size this checker understands; any image whose superblock
/// claims otherwise (`s_log_zone_size != 0`) is rejected in `superblock.rs`.
pub const BLOCK_SIZE: usize = 1024;
