mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wsorch_core::Selection;

#[derive(Parser)]
#[command(name = "wsorch")]
#[command(about = "Build, install and clean orchestration for JavaScript monorepo workspaces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root; discovered from wsorch.toml when omitted.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short, long, action, global = true)]
    quiet: bool,
}

/// Package selection shared by every per-package command.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Comma separated package names to include (default: all).
    #[arg(long, default_value = "")]
    packages: String,

    /// Comma separated package names to skip.
    #[arg(long, default_value = "")]
    exclude: String,

    /// Run on a worker pool instead of one package at a time.
    #[arg(long, action)]
    parallel: bool,

    /// Worker count for parallel runs; implies --parallel.
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

impl SelectionArgs {
    pub fn selection(&self) -> Selection {
        Selection::from_lists(&self.packages, &self.exclude)
    }

    pub fn parallel(&self) -> bool {
        self.parallel || self.jobs.is_some()
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install dependencies.
    Install {
        #[command(flatten)]
        select: SelectionArgs,
        /// Skip devDependencies.
        #[arg(long, action)]
        prod: bool,
    },
    /// Build every package whose sources changed since its last build.
    Build {
        #[command(flatten)]
        select: SelectionArgs,
        /// Use the build-dev script where a package declares one.
        #[arg(long, action)]
        dev: bool,
    },
    /// Delete node_modules, build output and build markers.
    Clean {
        #[command(flatten)]
        select: SelectionArgs,
        #[arg(long, action, conflicts_with = "node_modules_only")]
        dist_only: bool,
        #[arg(long, action)]
        node_modules_only: bool,
    },
    /// Run the package manager with the given arguments in every package.
    Pnpm {
        #[command(flatten)]
        select: SelectionArgs,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Like `pnpm`, but keeps going when a package fails.
    PnpmNoerr {
        #[command(flatten)]
        select: SelectionArgs,
        /// Exit non-zero if any package failed.
        #[arg(long, action)]
        strict_exit: bool,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Point workspace dependency ranges at the current member versions.
    SyncVersions {
        #[arg(long, action)]
        dry_run: bool,
    },
    /// Remove package-lock.json and node_modules from every package.
    DeletePackageLock {
        #[command(flatten)]
        select: SelectionArgs,
    },
    /// List packages in build order.
    List {
        #[command(flatten)]
        select: SelectionArgs,
        #[arg(long, action)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = cli.root.as_deref();

    match cli.command {
        Commands::Install { select, prod } => commands::cmd_install(root, &select, prod)?,
        Commands::Build { select, dev } => commands::cmd_build(root, &select, dev)?,
        Commands::Clean {
            select,
            dist_only,
            node_modules_only,
        } => commands::cmd_clean(root, &select, dist_only, node_modules_only)?,
        Commands::Pnpm { select, args } => commands::cmd_run(root, &select, args, false, true)?,
        Commands::PnpmNoerr {
            select,
            strict_exit,
            args,
        } => commands::cmd_run(root, &select, args, true, strict_exit)?,
        Commands::SyncVersions { dry_run } => commands::cmd_sync_versions(root, dry_run)?,
        Commands::DeletePackageLock { select } => commands::cmd_delete_package_lock(root, &select)?,
        Commands::List { select, json } => commands::cmd_list(root, &select, json)?,
    }

    Ok(())
}
