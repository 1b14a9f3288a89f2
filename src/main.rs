//! `fsck.minix`: command-line wrapper around the [`minixck`] checker core.
//!
//! Argument parsing is hand-rolled over `std::env::args()`, bundled short
//! flags walked byte-by-byte, in the same style as the rest of this
//! workspace's CLI tools — no argument-parsing crate.

use std::path::PathBuf;
use std::process::exit;

use minixck::checker;
use minixck::checker::Outcome;
use minixck::checker::RunFlags;
use minixck::error::CheckError;
use minixck::mount;
use minixck::operator::Automatic;
use minixck::operator::Interactive;
use minixck::operator::Operator;
use minixck::operator::ReadOnly;

const USAGE: &str = "\
Usage: fsck.minix [-larvsmf] device

  -l       list all filenames
  -a       automatically repair the filesystem, no questions
  -r       interactively repair the filesystem
  -v       verbose
  -s       output the superblock contents
  -m       warn about inodes with a non-zero mode but not allocated
  -f       force a check even if the filesystem is marked clean
  -V       print version and exit
";

struct Args {
	flags: RunFlags,
	automatic: bool,
	interactive: bool,
	version: bool,
	device: Option<PathBuf>,
}

fn usage_error(msg: &str) -> ! {
	eprintln!("fsck.minix: {msg}");
	eprint!("{USAGE}");
	exit(16);
}

fn parse_args() -> Args {
	let mut args = Args {
		flags: RunFlags::default(),
		automatic: false,
		interactive: false,
		version: false,
		device: None,
	};

	for arg in std::env::args().skip(1) {
		if arg == "-V" || arg == "--version" {
			args.version = true;
			continue;
		}
		if let Some(bundle) = arg.strip_prefix('-') {
			if bundle.is_empty() {
				usage_error("unrecognized option `-'");
			}
			for flag in bundle.chars() {
				match flag {
					'l' => args.flags.list = true,
					'a' => args.automatic = true,
					'r' => args.interactive = true,
					'v' => args.flags.verbose = true,
					's' => args.flags.show = true,
					'm' => args.flags.warn_mode = true,
					'f' => args.flags.force = true,
					other => usage_error(&format!("unrecognized option `-{other}'")),
				}
			}
			continue;
		}
		if args.device.is_some() {
			usage_error("only one device may be given");
		}
		args.device = Some(PathBuf::from(arg));
	}

	if args.automatic && args.interactive {
		usage_error("-a and -r are mutually exclusive");
	}
	args.flags.repair = args.automatic || args.interactive;

	args
}

fn build_operator(args: &Args) -> Box<dyn Operator> {
	if args.automatic {
		Box::new(Automatic)
	} else if args.interactive {
		Box::new(Interactive::new())
	} else {
		Box::new(ReadOnly)
	}
}

fn main() {
	let args = parse_args();

	if args.version {
		println!("fsck.minix {}", env!("CARGO_PKG_VERSION"));
		exit(0);
	}

	let Some(device) = args.device else {
		usage_error("no device specified");
	};

	let mut operator = build_operator(&args);

	if mount::is_mounted(&device) && args.flags.repair {
		eprintln!(
			"fsck.minix: {} is mounted; refusing to repair a live filesystem",
			device.display()
		);
		let proceed = args.interactive && operator.ask("Continue anyway", false);
		if !proceed {
			eprintln!("fsck.minix: check aborted");
			exit(0);
		}
	}

	match checker::run(&device, operator, args.flags) {
		Ok(Outcome::Clean) => {
			println!("{}: clean", device.display());
			exit(0);
		}
		Ok(Outcome::Checked {
			changed,
			uncorrected,
		}) => {
			let mut code = 0;
			if changed {
				code |= 3;
			}
			if uncorrected {
				code |= 4;
			}
			exit(code);
		}
		Err(CheckError::Corrupt(msg)) => {
			eprintln!("fsck.minix: {}: {msg}", device.display());
			exit(8);
		}
		Err(CheckError::Io(e)) => {
			eprintln!("fsck.minix: {}: {e}", device.display());
			exit(8);
		}
	}
}
