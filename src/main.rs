//! recmod - kernel module and firmware pruning for initrd staging trees.
//!
//! Given a staged root with `usr/lib/modules/<kver>` and `usr/lib/firmware`,
//! keeps the modules the include/exclude filters select plus everything
//! they depend on, and removes the rest.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use recmod::commands;
use recmod::config::Config;

#[derive(Parser)]
#[command(name = "recmod")]
#[command(about = "Kernel module and firmware closure for initrd staging trees")]
#[command(
    after_help = "QUICK START:\n  recmod preflight                     Check modinfo and the staged root\n  recmod plan --exclude kernel/sound   Show what would be removed\n  recmod prune --exclude kernel/sound  Remove it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove modules and firmware not needed by the filtered module set
    Prune {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show what prune would keep and remove, without touching anything
    Plan {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Run preflight checks (modinfo available, staged root looks sane)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

#[derive(Args)]
struct FilterArgs {
    /// Staged root directory (default: RECMOD_ROOT or .)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Kernel version (default: RECMOD_KERNEL_VERSION or auto-detect)
    #[arg(long)]
    kver: Option<String>,

    /// Regex protecting matching modules from exclusion (repeatable)
    #[arg(long = "include")]
    include: Vec<String>,

    /// Regex selecting modules to remove (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Also protect every module loaded on this machine
    #[arg(long)]
    include_host: bool,

    /// Module introspection program (default: modinfo)
    #[arg(long)]
    modinfo: Option<String>,

    /// Module names per modinfo invocation
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Print notes (missing firmware, collisions, fast path); with plan, list removed paths
    #[arg(short, long)]
    verbose: bool,
}

impl FilterArgs {
    /// Flags override the environment.
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(kver) = &self.kver {
            config.kernel_version = Some(kver.clone());
        }
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if let Some(modinfo) = &self.modinfo {
            config.modinfo = modinfo.clone();
        }
        if let Some(size) = self.chunk_size {
            if size == 0 {
                anyhow::bail!("--chunk-size must be at least 1");
            }
            config.chunk_size = size;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Prune { filter } => {
            filter.apply(&mut config)?;
            commands::cmd_prune(&config, filter.include_host, filter.verbose)?;
        }

        Commands::Plan { filter, json } => {
            filter.apply(&mut config)?;
            commands::cmd_plan(&config, filter.include_host, filter.verbose, json)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }
    }

    Ok(())
}
