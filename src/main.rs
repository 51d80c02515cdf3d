mod config;
mod logs;
mod now;
mod server;
mod types;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use crate::config::{CommonConfig, ConfigArgs};
use crate::server::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct ServerArgs {
    /// Print the completed server configuration (TOML) and exit.
    #[arg(long)]
    pub print_config: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

async fn run(args: ServerArgs) -> Result<()> {
    let ps = args.config.build_path_set()?;
    let cfg: ServerConfig = ps.load_config("server", ServerConfig::default)?;

    if args.print_config {
        let data = toml::to_string_pretty(&cfg).context("serialize config")?;
        print!("{data}");
        return Ok(());
    }

    logs::init(&cfg.log_level)?;

    let ctx = cfg.build_ctx()?;
    let restful_server = cfg.build_restful_server(ctx)?;

    restful_server.run().await.context("run restful server")?;

    info!("Server exited by user");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    match run(args).await {
        Ok(()) => {}
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
