//! Applying a registered peer to the running interface.

use super::{describe_failure, run_command};

#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("failed to start `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` {reason}")]
    Exit { command: String, reason: String },
}

/// Activates a peer on the live tunnel interface.
///
/// Activation is independent of the config files: a failure here does not
/// undo anything already written.
pub trait InterfaceControl {
    fn apply_peer(&self, public_key: &str, allowed_ips: &str) -> Result<(), InterfaceError>;
}

/// Runs `wg set <interface> peer <key> allowed-ips <address>` and waits
/// for it to exit
#[derive(Debug, Clone)]
pub struct WgSetCommand {
    wg_binary: String,
    interface: String,
}

impl WgSetCommand {
    pub fn new(wg_binary: impl Into<String>, interface: impl Into<String>) -> Self {
        WgSetCommand {
            wg_binary: wg_binary.into(),
            interface: interface.into(),
        }
    }
}

impl InterfaceControl for WgSetCommand {
    fn apply_peer(&self, public_key: &str, allowed_ips: &str) -> Result<(), InterfaceError> {
        let args = ["set", self.interface.as_str(), "peer", public_key, "allowed-ips", allowed_ips];
        let command = format!("{} {}", self.wg_binary, args.join(" "));

        let output = run_command(&self.wg_binary, &args, None).map_err(|e| InterfaceError::Spawn {
            command: command.clone(),
            reason: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(InterfaceError::Exit {
                reason: describe_failure(&output),
                command,
            });
        }
        log::info!("Applied peer {} ({}) to {}", public_key, allowed_ips, self.interface);
        Ok(())
    }
}

/// Leaves the live interface untouched; used when only the files are managed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterface;

impl InterfaceControl for NoInterface {
    fn apply_peer(&self, public_key: &str, _allowed_ips: &str) -> Result<(), InterfaceError> {
        log::debug!("Interface activation disabled, not applying {}", public_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_fails_to_spawn() {
        let control = WgSetCommand::new("/nonexistent/wg-binary", "wg0");
        let err = control.apply_peer("KEY=", "10.0.0.2/24").unwrap_err();
        assert!(matches!(err, InterfaceError::Spawn { .. }));
        assert!(err.to_string().contains("set wg0 peer KEY= allowed-ips 10.0.0.2/24"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        // `false` ignores its arguments and exits 1
        let control = WgSetCommand::new("false", "wg0");
        let err = control.apply_peer("KEY=", "10.0.0.2/24").unwrap_err();
        assert!(matches!(err, InterfaceError::Exit { .. }));
    }

    #[test]
    fn test_no_interface_always_succeeds() {
        assert!(NoInterface.apply_peer("KEY=", "10.0.0.2/24").is_ok());
    }
}
