//! Features common to the `fsck.minix` binary: TTY prompting for the
//! interactive operator.

pub mod prompt;
