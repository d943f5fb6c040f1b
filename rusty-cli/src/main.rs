mod cli;
mod commands;
mod config;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command};
use commands::run_cmd::RunOptions;
use config::ConfigContext;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            module,
            config,
            width,
            height,
        } => {
            let ctx = config::load_config(config.as_deref())?;
            init_logging(&ctx);
            let opts = RunOptions {
                module: module_path(module, &ctx)?,
                width: width.unwrap_or(ctx.config.window.width),
                height: height.unwrap_or(ctx.config.window.height),
            };
            commands::run_cmd::run(opts, ctx).await
        }
        Command::Inspect { module, config } => {
            let ctx = config::load_config(config.as_deref())?;
            init_logging(&ctx);
            let module = module_path(module, &ctx)?;
            commands::inspect_cmd::run(module, ctx).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// RUST_LOG wins over the config's `log_level`.
fn init_logging(ctx: &ConfigContext) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(ctx.config.log_level.as_str()),
    )
    .init();
    if let Some(path) = &ctx.path {
        log::debug!("Using config {}", path.display());
    }
}

/// A module given on the command line is taken as-is; one from the config
/// is relative to the config file.
fn module_path(arg: Option<String>, ctx: &ConfigContext) -> anyhow::Result<String> {
    match (arg, &ctx.config.module) {
        (Some(path), _) => Ok(path),
        (None, Some(path)) => Ok(ctx.resolve(path)),
        (None, None) => anyhow::bail!(
            "No module to run.\n\
             Pass a .wasm path, or set `module` in {}.",
            config::CONFIG_FILE
        ),
    }
}
