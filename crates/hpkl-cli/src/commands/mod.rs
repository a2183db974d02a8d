//! Command implementations and dispatch logic.

use hpkl_config::AppConfig;
use hpkl_core::error::HpklResult;
use tracing::info;

pub mod download;
pub mod resolve;

#[cfg(test)]
mod tests;

use crate::output::OutputHandler;
use crate::{Commands, ProjectCommands};

/// Shared context for all commands
pub struct CommandContext {
    pub config: AppConfig,
    pub output: OutputHandler,
}

impl CommandContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            output: OutputHandler::new(),
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> HpklResult<()> {
    match command {
        Commands::Resolve { dirs }
        | Commands::Project {
            command: ProjectCommands::Resolve { dirs },
        } => {
            info!(projects = dirs.len().max(1), "Resolving dependencies");
            resolve::execute(dirs, ctx).await
        },
        Commands::DownloadPackage { packages } => {
            info!(packages = packages.len(), cache = %ctx.config.cache_dir, "Linking packages");
            download::execute(&packages, ctx)
        },
        Commands::Version => {
            show_version(ctx);
            Ok(())
        },
    }
}

fn show_version(ctx: &CommandContext) {
    ctx.output.info(&format!("hpkl v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Built: {}", env!("HPKL_BUILD_DATE")));
    ctx.output.info(&format!("Target: {}", env!("HPKL_BUILD_TARGET")));
    ctx.output.info(&format!("Rust: {}", env!("HPKL_RUSTC_VERSION")));
}
