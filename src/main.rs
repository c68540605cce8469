use clap::Parser;
use colored::Colorize;

use visitlog::cli::Cli;
use visitlog::config::{StaticConfig, get_config, init_config, update_config};
use visitlog::errors::VisitLogError;
use visitlog::runtime;
use visitlog::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    init_config(&cli.config);
    let mut config = (*get_config()).clone();
    cli.apply_overrides(&mut config);
    update_config(config);

    // guard 需要存活到进程退出，否则非阻塞日志可能丢失
    let log_guard = init_logging(&get_config().logging)?;

    if let Err(e) = runtime::run_server().await {
        match e.downcast_ref::<VisitLogError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("{} {:#}", "[ERROR]".red().bold(), e),
        }
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}
