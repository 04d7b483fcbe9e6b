use anyhow::Result;
use clap::Parser;
use tracing::error;

use commentary::cli::{Cli, Commands, run_command};
use commentary::config::{get_config, init_config_from};
use commentary::runtime::modes::run_server;
use commentary::system::init_logging;
use commentary::system::panic_handler::{RunMode, install_panic_hook};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(&cli.config);
    let config = get_config();

    let command = cli.command_or_default();
    let mode = match command {
        Commands::Serve => RunMode::Server,
        _ => RunMode::Command,
    };
    install_panic_hook(mode);

    // guard 必须存活到进程结束，否则缓冲中的日志会丢失
    let _log_guard = init_logging(&config.logging)?;

    if mode == RunMode::Server {
        return run_server().await.inspect_err(|e| {
            error!("Server exited with error: {:#}", e);
        });
    }

    if let Err(e) = run_command(command).await {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
    Ok(())
}
