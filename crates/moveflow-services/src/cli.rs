//! Running the Aptos CLI and reading its JSON envelope.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use moveflow_core::error::{MoveflowError, Result};

/// Captured output of one CLI invocation.
pub(crate) struct CliOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program args..` with a timeout. A missing binary or a timeout is an
/// error; a non-zero exit is not.
pub(crate) async fn run(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
    service: &str,
) -> Result<CliOutput> {
    debug!(program, ?args, "Running CLI");

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let result = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await;
    match result {
        Ok(Ok(output)) => Ok(CliOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(MoveflowError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to run {}: {}", program, e),
        ))),
        Err(_) => Err(MoveflowError::Timeout {
            service: service.to_string(),
            timeout_secs,
        }),
    }
}

/// The CLI's `{"Result": ...}` / `{"Error": "..."}` envelope.
#[derive(Debug, PartialEq)]
pub(crate) enum Envelope {
    Result(Value),
    Error(String),
}

/// Find the JSON envelope in CLI stdout. Progress lines may precede it.
pub(crate) fn parse_envelope(stdout: &str) -> Option<Envelope> {
    let start = stdout.find('{')?;
    let value: Value = serde_json::from_str(stdout[start..].trim()).ok()?;
    if let Some(result) = value.get("Result") {
        return Some(Envelope::Result(result.clone()));
    }
    value
        .get("Error")
        .map(|e| Envelope::Error(e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_after_progress_lines() {
        let out = "Compiling, may take a little while...\n{\n  \"Result\": [\"0x1::counter\"]\n}\n";
        assert_eq!(
            parse_envelope(out),
            Some(Envelope::Result(json!(["0x1::counter"])))
        );
    }

    #[test]
    fn test_envelope_error() {
        let out = r#"{"Error": "Move compilation failed: unbound module"}"#;
        assert_eq!(
            parse_envelope(out),
            Some(Envelope::Error("Move compilation failed: unbound module".into()))
        );
    }

    #[test]
    fn test_no_envelope() {
        assert_eq!(parse_envelope("panicked at main.rs"), None);
    }
}
