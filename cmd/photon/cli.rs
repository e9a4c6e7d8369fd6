//! `photon`'s CLI surface (§10.5): a config-file path plus a handful of
//! overrides, grouped into `help_heading`s the way `cmd/ethrex/cli.rs`
//! groups its own options.

use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand as ClapSubcommand};
use ethereum_types::Address;
use tracing::metadata::Level;

use crate::DEFAULT_CONFIG_PATH;

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[derive(ClapParser)]
#[command(name = "photon", author = "Photon Contributors", version = VERSION_STRING, about = "A light client that tracks one account's header chain and transactions over a single LES/PIP peer")]
pub struct Cli {
    #[command(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(ClapParser)]
pub struct Options {
    #[arg(
        long = "config",
        value_name = "CONFIG_FILE_PATH",
        default_value = DEFAULT_CONFIG_PATH,
        help = "TOML config file: watched address, remote peer enode, network identity.",
        help_heading = "Node options"
    )]
    pub config: PathBuf,

    #[arg(
        long = "watch",
        value_name = "ADDRESS",
        help = "Overrides the watched_address field from the config file.",
        help_heading = "Node options"
    )]
    pub watch: Option<Address>,

    #[arg(
        long = "remote-peer",
        value_name = "ENODE_URL",
        help = "Overrides the remote_peer field from the config file.",
        help_heading = "P2P options"
    )]
    pub remote_peer: Option<String>,

    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        help = "Possible values: trace, debug, info, warn, error",
        help_heading = "Node options"
    )]
    pub log_level: Level,
}

#[derive(ClapSubcommand)]
pub enum Command {
    /// Submit a raw signed transaction (already RLP-encoded, hex) and track its status.
    SubmitTx {
        #[arg(value_name = "RAW_TX_HEX")]
        raw_tx: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
