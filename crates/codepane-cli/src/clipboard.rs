//! System clipboard through whichever helper program is installed.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use codepane::{Clipboard, ClipboardError};

/// Helpers in order of preference, with the arguments that make them read
/// stdin into the clipboard.
const CANDIDATES: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip.exe", &[]),
];

pub struct SystemClipboard {
    program: Option<(PathBuf, &'static [&'static str])>,
}

impl SystemClipboard {
    pub fn detect() -> Self {
        for &(name, args) in CANDIDATES {
            if let Ok(path) = which::which(name) {
                log::debug!("Using clipboard helper at {}", path.display());
                return Self {
                    program: Some((path, args)),
                };
            }
        }
        log::debug!("No clipboard helper found in PATH");
        Self { program: None }
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        let (program, args) = self.program.as_ref().ok_or(ClipboardError::Unavailable)?;
        let mut child = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Rejected {
                program: program.display().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
