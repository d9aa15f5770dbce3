//! External capabilities: key generation and live interface control.
//!
//! Both are traits so the registrar can be driven by the real `wg` tool in
//! production and by in-process doubles in tests. Calls are synchronous;
//! the registrar waits for each result before moving on.

pub mod interface;
pub mod keygen;

pub use interface::{InterfaceControl, InterfaceError, NoInterface, WgSetCommand};
pub use keygen::{KeyGenError, KeyGenerator, Keypair, WgKeyGenerator};

use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Run a command to completion, optionally feeding `stdin`
pub(crate) fn run_command(program: &str, args: &[&str], stdin: Option<&str>) -> std::io::Result<Output> {
    log::debug!("Running {} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                // Close our end and reap the child before reporting
                drop(pipe);
                if let Err(wait_err) = child.wait() {
                    log::warn!("Failed to wait for {}: {}", program, wait_err);
                }
                return Err(e);
            }
        }
    }
    child.wait_with_output()
}

/// Describe a failed command from its exit status and stderr
pub(crate) fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        format!("exited with {}: {}", output.status, stderr)
    }
}
