use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "reimburse")]
#[command(about = "Decide and settle expense reimbursements against the payment network")]
pub struct Cli {
    /// TOML 設定檔；未指定時改讀環境變數
    #[arg(long, short = 'c', global = true, env = "REIMBURSE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Print results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Submit a free-text expense, e.g. "Lunch with client - $45"
    Submit {
        text: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,
    },

    /// Look up the status of a transaction
    Status { transaction_id: String },

    /// Check that the payment service answers
    Ping,

    /// List wallet balances
    Wallets,

    /// Register a payee (no-op when the payee already exists)
    RegisterPayee {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,
    },
}
