use clap::Parser;
use reimburse_flow::config::cli::Command;
use reimburse_flow::utils::logger;
use reimburse_flow::utils::validation::Validate;
use reimburse_flow::{
    extract, Claimant, Cli, ConfigProvider, EnvConfig, HttpWorkflow, PaymentNetwork,
    ReimburseError, ReimbursementOutcome, TomlConfig,
};
use std::process::ExitCode;

const EXIT_OK: u8 = 0;
const EXIT_INPUT: u8 = 1;
const EXIT_REQUIRES_APPROVAL: u8 = 2;
const EXIT_REJECTED: u8 = 3;
const EXIT_INFRASTRUCTURE: u8 = 4;

#[tokio::main]
async fn main() -> ExitCode {
    // .env 不存在不是錯誤
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let toml_config = match cli.config.as_ref().map(TomlConfig::from_file).transpose() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            return ExitCode::from(EXIT_INPUT);
        }
    };

    // 初始化日誌
    let format = toml_config
        .as_ref()
        .map(|c| c.log_format())
        .unwrap_or_default();
    logger::init_logger(format, cli.verbose);
    tracing::info!("Starting reimburse CLI");

    let workflow = match toml_config {
        Some(config) => build(&config),
        None => EnvConfig::from_env().and_then(|config| build(&config)),
    };
    let workflow = match workflow {
        Ok(workflow) => workflow,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            return ExitCode::from(EXIT_INPUT);
        }
    };

    match run(&cli, &workflow).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            if e.is_infrastructure() {
                ExitCode::from(EXIT_INFRASTRUCTURE)
            } else {
                ExitCode::from(EXIT_INPUT)
            }
        }
    }
}

fn build<C: ConfigProvider + Validate>(config: &C) -> Result<HttpWorkflow, ReimburseError> {
    config.validate()?;
    reimburse_flow::connect(config)
}

async fn run(cli: &Cli, workflow: &HttpWorkflow) -> Result<u8, ReimburseError> {
    match &cli.command {
        Command::Submit { text, email, name } => {
            let claim = extract(text, Claimant::new(email.clone(), name.clone()))?;
            let outcome = workflow.process(&claim).await?;
            print_outcome(&outcome, cli.json)?;

            Ok(match outcome {
                ReimbursementOutcome::Reimbursed { .. } => EXIT_OK,
                ReimbursementOutcome::RequiresApproval { .. } => EXIT_REQUIRES_APPROVAL,
                ReimbursementOutcome::Rejected { .. } => EXIT_REJECTED,
            })
        }
        Command::Status { transaction_id } => {
            let status = workflow.transaction_status(transaction_id).await?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "transaction_id": transaction_id, "status": status })
                );
            } else {
                println!("📄 Transaction {}: {}", transaction_id, status);
            }
            Ok(EXIT_OK)
        }
        Command::Ping => {
            let connected = workflow.test_connection().await;
            if cli.json {
                println!("{}", serde_json::json!({ "connected": connected }));
            } else if connected {
                println!("✅ Payment service reachable");
            } else {
                println!("❌ Payment service unreachable");
            }
            Ok(if connected { EXIT_OK } else { EXIT_INFRASTRUCTURE })
        }
        Command::Wallets => {
            let wallets = workflow.network().list_wallets().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&wallets)?);
            } else if wallets.is_empty() {
                println!("No wallet balances reported");
            } else {
                for wallet in wallets {
                    println!(
                        "💰 {}: {} {}",
                        wallet.name.as_deref().unwrap_or("wallet"),
                        wallet.balance,
                        wallet.currency
                    );
                }
            }
            Ok(EXIT_OK)
        }
        Command::RegisterPayee { email, name } => {
            let registration = workflow.network().create_payee(email, name).await?;
            println!("👤 {} <{}>: {:?}", name, email, registration);
            Ok(EXIT_OK)
        }
    }
}

fn print_outcome(outcome: &ReimbursementOutcome, json: bool) -> Result<(), ReimburseError> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        ReimbursementOutcome::Reimbursed { .. } => println!("✅ {}", outcome),
        ReimbursementOutcome::RequiresApproval { .. } => println!("⏸️ {}", outcome),
        ReimbursementOutcome::Rejected { .. } => println!("❌ {}", outcome),
    }
    Ok(())
}
