//! Child processes with a hard timeout

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run `cmd` to completion, feeding `input` on stdin.
///
/// The child is killed if `limit` elapses first; that surfaces as
/// [`Error::Timeout`] labelled with `label`.
pub async fn output(
    mut cmd: Command,
    input: Option<&[u8]>,
    limit: Duration,
    label: &str,
) -> Result<Output> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::Dependency(format!("{label}: executable not found")),
        _ => Error::Io(e),
    })?;

    if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin.write_all(bytes).await?;
        // closing stdin lets line-oriented helpers see EOF
        drop(stdin);
    }

    tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout(label.to_string()))?
        .map_err(Error::from)
}
