use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Runs `cmd` to completion and returns its exit code, stdout and stderr.
pub async fn exec_capture(cmd: &str, args: &[&str]) -> Result<(i32, Vec<u8>, Vec<u8>)> {
    let mut c = Command::new(cmd);
    c.args(args);
    c.stdin(Stdio::null());
    c.stdout(Stdio::piped());
    c.stderr(Stdio::piped());
    c.kill_on_drop(true);
    let output = c
        .spawn()
        .with_context(|| format!("failed to spawn {}", cmd))?
        .wait_with_output()
        .await?;
    let code = output.status.code().unwrap_or(-1);
    Ok((code, output.stdout, output.stderr))
}
