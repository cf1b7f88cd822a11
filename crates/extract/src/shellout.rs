//! Bounded execution of external extraction tools (`tesseract`, `pdftoppm`).

use std::{io::Write, process::Stdio, time::Duration};

use tokio::process::Command;

use crate::error::{Context, Error, Result};

/// Run `cmd` to completion within `timeout` and return at most
/// `max_stdout_bytes` of its stdout. A missing binary, a timeout, and a
/// non-zero exit are distinct errors.
pub async fn run_bounded(
    mut cmd: Command,
    tool: &'static str,
    timeout: Duration,
    max_stdout_bytes: usize,
) -> Result<Vec<u8>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ToolNotFound { tool }
        } else {
            Error::external(format!("failed to spawn {tool}"), e)
        }
    })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout {
            tool,
            seconds: timeout.as_secs(),
        })?
        .with_context(|| format!("failed to wait for {tool}"))?;

    if !output.status.success() {
        return Err(Error::NonZeroExit {
            tool,
            status: output.status.to_string(),
        });
    }

    let mut stdout = output.stdout;
    stdout.truncate(max_stdout_bytes);
    Ok(stdout)
}

/// Write `bytes` to a fresh temp file with the given suffix. The file is
/// removed when the handle is dropped.
pub fn write_temp_file(bytes: &[u8], suffix: &str) -> Result<tempfile::NamedTempFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix("claimguard-")
        .suffix(suffix)
        .tempfile()
        .context("failed to create temp file")?;
    tmp.write_all(bytes).context("failed to write temp file")?;
    tmp.flush().context("failed to flush temp file")?;
    Ok(tmp)
}

/// File suffix that lets the tool sniff the format.
pub fn suffix_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "application/pdf" => ".pdf",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tif",
        _ => ".bin",
    }
}

/// Keep at most `max_chars` characters of `s`.
pub fn clip_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let cmd = Command::new("__claimguard_no_such_tool__");
        let err = run_bounded(cmd, "ghost", Duration::from_secs(1), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { tool: "ghost" }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_capped() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello world");
        let out = run_bounded(cmd, "echo", Duration::from_secs(5), 5)
            .await
            .unwrap();
        assert_eq!(out, b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let cmd = Command::new("false");
        let err = run_bounded(cmd, "false", Duration::from_secs(5), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NonZeroExit { .. }));
    }

    #[test]
    fn temp_file_holds_bytes() {
        let tmp = write_temp_file(b"abc", ".pdf").unwrap();
        assert_eq!(std::fs::read(tmp.path()).unwrap(), b"abc");
        assert!(tmp.path().to_string_lossy().ends_with(".pdf"));
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip_chars("héllo", 2), "hé");
        assert_eq!(clip_chars("hi", 10), "hi");
    }
}
