/*!
 * skiff CLI - command line interface
 */

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use skiff::config::{EngineConfig, Settings, TransferOptions};
use skiff::connection::RestConnection;
use skiff::error::{Result, SkiffError, EXIT_SUCCESS};
use skiff::logging;
use skiff::transfer::TransferOrchestrator;
use skiff::uri::{is_remote_uri, parse_remote_uri};

#[derive(Parser)]
#[command(name = "skiff")]
#[command(version, about = "Move files between local filesystems and flat-namespace object stores", long_about = None)]
struct Cli {
    /// Path to the config file (default: ~/.skiff/config.toml)
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Verbose diagnostic output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Only entries matching this pattern survive an exclusion (`*` and `?`)
    #[arg(long, value_name = "PATTERN")]
    include: Option<String>,

    /// Skip entries matching this pattern (`*` and `?`)
    #[arg(long, value_name = "PATTERN")]
    exclude: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Copy between a local path and a remote address (os://bucket/prefix)
    Cp {
        /// Local path or os:// address
        source: String,
        /// Local path or os:// address
        dest: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Overwrite existing destinations instead of skipping them
        #[arg(short = 'f', long = "force")]
        force: bool,

        /// Concurrent part workers
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Part size in bytes for multipart transfers
        #[arg(long = "part-size", value_name = "BYTES")]
        part_size: Option<u64>,
    },

    /// List keys under a remote prefix
    Ls {
        /// os://bucket[/prefix]
        address: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Remove keys under a remote prefix
    Rm {
        /// os://bucket[/prefix]
        address: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Create a bucket
    Mb {
        /// os://bucket
        address: String,
    },

    /// Remove a bucket
    Rb {
        /// os://bucket
        address: String,

        /// Remove remaining keys first
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(Default::default(), cli.verbose) {
        eprintln!("skiff: {}", err);
        process::exit(err.exit_code());
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("skiff: failed to start runtime: {}", err);
            process::exit(SkiffError::Io(err).exit_code());
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => process::exit(EXIT_SUCCESS),
        Err(err) => {
            error!("{}", err);
            process::exit(err.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Cp {
            source,
            dest,
            filter,
            force,
            workers,
            part_size,
        } => {
            let engine = engine_with_overrides(&settings, workers, part_size);
            let orch = orchestrator(&settings, engine)?;
            let opts = TransferOptions {
                include: filter.include,
                exclude: filter.exclude,
                force,
            };
            copy(&orch, &source, &dest, &opts).await
        }
        Command::Ls { address, filter } => {
            let orch = orchestrator(&settings, settings.engine.clone())?;
            let opts = TransferOptions {
                include: filter.include,
                exclude: filter.exclude,
                force: false,
            };
            let source = parse_remote_uri(&address)?;
            for record in orch.list_keys(&source, &opts).await? {
                println!("{:>12}  {}", record.size, record.key);
            }
            Ok(())
        }
        Command::Rm { address, filter } => {
            let orch = orchestrator(&settings, settings.engine.clone())?;
            let opts = TransferOptions {
                include: filter.include,
                exclude: filter.exclude,
                force: false,
            };
            let target = parse_remote_uri(&address)?;
            orch.remove_multiple_keys(&target, &opts).await
        }
        Command::Mb { address } => {
            let orch = orchestrator(&settings, settings.engine.clone())?;
            let target = parse_remote_uri(&address)?;
            orch.create_bucket(&target.bucket).await
        }
        Command::Rb { address, force } => {
            let orch = orchestrator(&settings, settings.engine.clone())?;
            let target = parse_remote_uri(&address)?;
            orch.delete_bucket(&target.bucket, force).await
        }
    }
}

fn engine_with_overrides(
    settings: &Settings,
    workers: Option<usize>,
    part_size: Option<u64>,
) -> EngineConfig {
    let mut engine = settings.engine.clone();
    if let Some(workers) = workers {
        engine.workers = workers;
    }
    if let Some(part_size) = part_size {
        engine.part_size = part_size;
    }
    engine
}

fn orchestrator(settings: &Settings, engine: EngineConfig) -> Result<TransferOrchestrator> {
    let conn = RestConnection::new(
        &settings.endpoint,
        &settings.access_key_id,
        &settings.secret_access_key,
    )?;
    TransferOrchestrator::new(Arc::new(conn), engine)
}

/// Infer transfer direction from which side is a remote address.
async fn copy(
    orch: &TransferOrchestrator,
    source: &str,
    dest: &str,
    opts: &TransferOptions,
) -> Result<()> {
    match (is_remote_uri(source), is_remote_uri(dest)) {
        (false, true) => {
            let remote = parse_remote_uri(dest)?;
            let local = Path::new(source);
            if local.is_dir() {
                orch.upload_files(local, &remote, opts).await
            } else {
                orch.upload_file(local, &remote, opts).await
            }
        }
        (true, false) => {
            let remote = parse_remote_uri(source)?;
            let local = Path::new(dest);
            if remote.is_prefix() {
                orch.download_files(&remote, local, opts).await
            } else {
                orch.download_file(&remote, local, opts).await
            }
        }
        (true, true) => Err(SkiffError::Config(
            "remote-to-remote copy is not supported".to_string(),
        )),
        (false, false) => Err(SkiffError::Config(
            "one side of cp must be an os:// address".to_string(),
        )),
    }
}
