//! Scripted stand-in for the ffmpeg binary.
//!
//! The script recognises the assembly stage from its arguments (`-f concat`
//! for concatenation, `-map` for muxing, anything else is a normalize), writes
//! a small file to the output path and emits `-progress` lines on stderr.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Misbehaviour injected into one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Print an error and exit 1
    Exit(&'static str),
    /// Print an error and never finish
    Hang(&'static str),
}

/// Stderr line the script prints before failing.
pub const FAULT_MESSAGE: &str = "simulated encoder error";

/// Body the script writes to every output file.
pub const OUTPUT_BODY: &[u8] = b"media";

/// Write an executable fake ffmpeg into `dir` and return its path.
pub fn fake_ffmpeg(dir: &Path, fault: Fault) -> PathBuf {
    let (stage, mode) = match fault {
        Fault::None => ("", "exit"),
        Fault::Exit(stage) => (stage, "exit"),
        Fault::Hang(stage) => (stage, "hang"),
    };

    let script = format!(
        r#"#!/bin/sh
for out in "$@"; do :; done
stage=normalize
case " $* " in
  *" -f concat "*) stage=concat ;;
  *" -map "*) stage=mux ;;
esac
if [ "$stage" = "{stage}" ]; then
  echo "$stage: {FAULT_MESSAGE}" >&2
  if [ "{mode}" = hang ]; then exec sleep 30; fi
  exit 1
fi
echo "out_time_us=1000000" >&2
echo "progress=end" >&2
printf media > "$out"
"#
    );

    let path = dir.join("ffmpeg");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
