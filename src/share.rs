use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::compositor::EncodedImage;
use crate::error::ShareError;

/// A file handed to the platform share mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    pub title: String,
    pub text: String,
}

impl ShareFile {
    pub fn vote_image(bytes: Vec<u8>) -> Self {
        Self {
            name: "vote.jpg".into(),
            mime: EncodedImage::MIME,
            bytes,
            title: "My vote".into(),
            text: "My vote with a filter".into(),
        }
    }
}

pub trait ShareTarget {
    /// Whether this platform can share files at all.
    fn can_share_files(&self) -> bool;

    fn share(&self, file: &ShareFile) -> Result<(), ShareError>;
}

/// Shares by placing the image on the system clipboard.
/// Uses wl-copy on Wayland, xclip on X11. Unsupported elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipboardShare;

impl ClipboardShare {
    #[cfg(target_os = "linux")]
    fn command(mime: &str) -> Option<(&'static str, Vec<String>)> {
        let session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();
        if session_type == "wayland" {
            Some(("wl-copy", vec!["--type".into(), mime.into()]))
        } else {
            Some((
                "xclip",
                vec![
                    "-selection".into(),
                    "clipboard".into(),
                    "-t".into(),
                    mime.into(),
                ],
            ))
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn command(_mime: &str) -> Option<(&'static str, Vec<String>)> {
        None
    }
}

impl ShareTarget for ClipboardShare {
    fn can_share_files(&self) -> bool {
        match Self::command(EncodedImage::MIME) {
            Some((cmd, _)) => on_path(cmd),
            None => false,
        }
    }

    fn share(&self, file: &ShareFile) -> Result<(), ShareError> {
        let (cmd, args) = Self::command(file.mime).ok_or(ShareError::Unsupported)?;

        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ShareError::Unsupported,
                _ => ShareError::Failed(format!("Failed to spawn {cmd}: {e}")),
            })?;

        if let Some(ref mut stdin) = child.stdin {
            stdin
                .write_all(&file.bytes)
                .map_err(|e| ShareError::Failed(e.to_string()))?;
        }
        drop(child.stdin.take());

        let status = child.wait().map_err(|e| ShareError::Failed(e.to_string()))?;
        if !status.success() {
            return Err(ShareError::Failed(format!(
                "{cmd} exited with status {status}"
            )));
        }

        log::info!("Shared {} ({} bytes) via {cmd}", file.name, file.bytes.len());
        Ok(())
    }
}

fn on_path(cmd: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| Path::new(&dir).join(cmd).is_file()))
        .unwrap_or(false)
}
