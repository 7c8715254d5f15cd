//! # CLI Interface
//!
//! Command-line arguments for `caution-node`, via `clap` derive. Every flag
//! that configures a long-running process has a `CAUTION_*` environment
//! fallback.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use caution_protocol::config::{ADDRESS_HRP, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// Caution deposit escrow node.
///
/// Hosts the escrow ledger and payment registry on a local sled database
/// and serves them over HTTP, with Prometheus metrics on a second port.
#[derive(Parser, Debug)]
#[command(
    name = "caution-node",
    about = "Caution deposit escrow node",
    version,
    propagate_version = true
)]
pub struct CautionNodeCli {
    /// Log output format.
    #[arg(
        long,
        global = true,
        value_enum,
        env = "CAUTION_LOG_FORMAT",
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and bind the ledger to an escrow identity.
    Init(InitArgs),
    /// Serve the HTTP API and metrics until interrupted.
    Run(RunArgs),
    /// Derive a well-formed address from a seed string.
    Address(AddressArgs),
    /// Print version information and exit.
    Version,
}

/// Location of the ledger database.
#[derive(Args, Debug, Clone)]
pub struct DataDirArg {
    /// Node data directory. Created on first use.
    #[arg(long, short = 'd', env = "CAUTION_DATA_DIR", default_value = ".caution")]
    pub data_dir: PathBuf,
}

impl DataDirArg {
    /// Path of the sled database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db")
    }
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub data: DataDirArg,

    /// Escrow identity that will own every deposit on this ledger.
    #[arg(long, env = "CAUTION_ESCROW")]
    pub escrow: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataDirArg,

    /// Port for the HTTP API.
    #[arg(long, env = "CAUTION_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CAUTION_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Escrow identity. When set, an uninitialized ledger is initialized
    /// with it; an initialized one must already carry it.
    #[arg(long, env = "CAUTION_ESCROW")]
    pub escrow: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Seed bytes to hash into the address payload.
    #[arg(long)]
    pub seed: String,

    /// Human-readable address prefix.
    #[arg(long, default_value = ADDRESS_HRP)]
    pub hrp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        CautionNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = CautionNodeCli::try_parse_from(["caution-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert_eq!(args.data.db_path(), PathBuf::from(".caution").join("db"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn init_takes_escrow() {
        let cli =
            CautionNodeCli::try_parse_from(["caution-node", "init", "--escrow", "caution1xyz"])
                .unwrap();
        match cli.command {
            Commands::Init(args) => assert_eq!(args.escrow, "caution1xyz"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_format_is_global() {
        let cli = CautionNodeCli::try_parse_from([
            "caution-node",
            "address",
            "--seed",
            "alice",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
