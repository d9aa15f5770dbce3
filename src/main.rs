use clap::{Parser, Subcommand};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use wgpeers::orchestrator::{PeerRegistrar, PeerRequest, RecoveryOutcome, SyncStatus};
use wgpeers::settings_loader::{self, SettingsOverrides};

/// Register WireGuard peers into the peer registry and server configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Server configuration file (overrides both settings locations)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Peer registry file (overrides both settings locations)
    #[arg(long)]
    registry_file: Option<PathBuf>,

    /// Tunnel interface to apply new peers to
    #[arg(short, long)]
    interface: Option<String>,

    /// Only update the files, do not touch the live interface
    #[arg(long)]
    no_apply: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new peer
    Add {
        /// Unique peer name
        name: String,

        /// Endpoint written into the peer section
        #[arg(long)]
        endpoint: Option<String>,

        /// PersistentKeepalive interval in seconds
        #[arg(long)]
        keepalive: Option<u32>,
    },
    /// List registered peers
    List,
    /// Append registry peers missing from the server configuration
    Sync,
    /// Resolve a commit interrupted between the config and registry writes
    Recover,
}

fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut settings = settings_loader::load_settings_or_default(args.settings.as_deref())?;
    let overrides = SettingsOverrides {
        config_file: args.config_file.clone(),
        registry_file: args.registry_file.clone(),
        interface: args.interface.clone(),
        no_apply: args.no_apply,
    };
    settings_loader::apply_overrides(&mut settings, &overrides)?;
    info!("Server configuration: {:?}", settings.config.resolve());
    info!("Peer registry: {:?}", settings.registry.resolve());

    let registrar = PeerRegistrar::from_settings(settings);

    match args.command {
        Command::Add { name, endpoint, keepalive } => {
            let request = PeerRequest {
                name,
                endpoint,
                persistent_keepalive: keepalive,
            };
            let result = registrar.register(&request);
            println!("{}", result);
            // Also printed when the peer reached the config but a later step failed
            if let Some(private_key) = result.private_key() {
                println!("Client private key: {}", private_key);
            }
            if result.is_committed() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::List => {
            let peers = registrar.list()?;
            for peer in peers {
                println!("{}\t{}\t{}\t{}", peer.name, peer.allowed_ips, peer.public_key, peer.created);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Sync => {
            let entries = registrar.sync_config()?;
            for entry in entries {
                match entry.status {
                    SyncStatus::Appended => println!("{}: added", entry.name),
                    SyncStatus::Collided { field, value } => {
                        println!("{}: skipped, {} {} already exists", entry.name, field, value)
                    }
                    SyncStatus::Incomplete { detail } => println!("{}: skipped, {}", entry.name, detail),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Recover => {
            match registrar.recover()? {
                RecoveryOutcome::Clean => println!("Nothing to recover"),
                RecoveryOutcome::Resumed { name } => println!("Registry updated with peer {}", name),
                RecoveryOutcome::AlreadyCommitted { name } => println!("Peer {} was already committed", name),
                RecoveryOutcome::Discarded { name } => println!("Discarded uncommitted peer {}", name),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["wgpeers", "add", "alice"]);
        assert!(args.settings.is_none());
        assert!(!args.no_apply);
        match args.command {
            Command::Add { name, endpoint, keepalive } => {
                assert_eq!(name, "alice");
                assert_eq!(endpoint, None);
                assert_eq!(keepalive, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_override_args() {
        let args = Args::parse_from([
            "wgpeers",
            "--settings", "wgpeers.yaml",
            "--config-file", "wg0.conf",
            "--no-apply",
            "add", "bob",
            "--endpoint", "203.0.113.7:51820",
            "--keepalive", "25",
        ]);

        assert_eq!(args.settings, Some(PathBuf::from("wgpeers.yaml")));
        assert_eq!(args.config_file, Some(PathBuf::from("wg0.conf")));
        assert!(args.no_apply);
        assert!(matches!(
            args.command,
            Command::Add { keepalive: Some(25), ref endpoint, .. } if endpoint.as_deref() == Some("203.0.113.7:51820")
        ));
    }

    #[test]
    fn test_subcommands() {
        assert!(matches!(Args::parse_from(["wgpeers", "sync"]).command, Command::Sync));
        assert!(matches!(Args::parse_from(["wgpeers", "recover"]).command, Command::Recover));
        assert!(matches!(Args::parse_from(["wgpeers", "list"]).command, Command::List));
    }
}
