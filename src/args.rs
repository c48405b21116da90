use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cwl", version, about = "Coin wallet ledger service")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serves the wallet HTTP API
    Serve {
        /// Address to bind the HTTP server
        #[arg(long, env = "WALLET_BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,

        /// Directory holding transactions.csv and wallets.csv; balances are kept in memory only
        /// when omitted
        #[arg(long, env = "WALLET_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Recomputes balances from the transaction log and prints every wallet that disagrees
    Reconcile {
        #[arg(long, env = "WALLET_DATA_DIR")]
        data_dir: PathBuf,
    },
}

/// Parses the input arguments, exiting with usage on error
pub fn parse_input_args() -> Args {
    Args::parse()
}
