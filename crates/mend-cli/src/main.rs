mod cmd_admit;
mod cmd_attest;
mod cmd_classify;
mod cmd_config;
mod cmd_gc;
mod cmd_init;
mod cmd_rollback;
mod cmd_snapshots;
mod cmd_status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mend", version, about = "Self-healing code mutations with lossless undo")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .mend/ workspace
    Init,
    /// Classify paths into file category and risk tier
    Classify {
        /// Paths to classify
        paths: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a candidate file set against the risk budget
    Admit {
        /// JSON file of candidates: [{"path": "src/a.ts", "loc_changed": 12}, ...]
        file: String,
        /// Number of recipes in the proposed session
        #[arg(long, default_value_t = 1)]
        recipes: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore files from a snapshot
    Rollback {
        /// Snapshot id (defaults to the most recent snapshot)
        #[arg(long)]
        snapshot: Option<String>,
        /// Most recent snapshot for this recipe id
        #[arg(long)]
        recipe: Option<String>,
        /// Snapshot nearest this time (RFC 3339)
        #[arg(long)]
        timestamp: Option<String>,
        /// Restore only these paths (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Preview the restore without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// List snapshots
    Snapshots {
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show snapshot store statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pin a snapshot so gc never removes it
    Pin {
        /// Snapshot id
        snapshot: String,
    },
    /// Unpin a snapshot
    Unpin {
        /// Snapshot id
        snapshot: String,
    },
    /// Remove snapshots past the retention window
    Gc {
        /// Preview without deleting
        #[arg(long)]
        dry_run: bool,
        /// Override retention days (default: from config or 30)
        #[arg(long)]
        keep_days: Option<u32>,
    },
    /// Attestation log operations
    Attest {
        #[command(subcommand)]
        cmd: AttestCmd,
    },
    /// Read or write workspace config (.mend/config.json)
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Show workspace status
    Status,
}

#[derive(Subcommand)]
enum AttestCmd {
    /// Check the hash chain end to end
    Verify,
    /// Print attestation entries, newest last
    Log {
        /// Maximum number of entries to show (0 = unlimited)
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => cmd_init::execute(&repo_root),
        Command::Classify { paths, json } => cmd_classify::execute(&paths, json),
        Command::Admit {
            file,
            recipes,
            json,
        } => cmd_admit::execute(&repo_root, &file, recipes, json),
        Command::Rollback {
            snapshot,
            recipe,
            timestamp,
            files,
            dry_run,
        } => cmd_rollback::execute(
            &repo_root,
            snapshot.as_deref(),
            recipe.as_deref(),
            timestamp.as_deref(),
            &files,
            dry_run,
        ),
        Command::Snapshots { json } => cmd_snapshots::list(&repo_root, json),
        Command::Stats { json } => cmd_snapshots::stats(&repo_root, json),
        Command::Pin { snapshot } => cmd_snapshots::pin(&repo_root, &snapshot, true),
        Command::Unpin { snapshot } => cmd_snapshots::pin(&repo_root, &snapshot, false),
        Command::Gc { dry_run, keep_days } => cmd_gc::execute(&repo_root, dry_run, keep_days),
        Command::Attest { cmd } => match cmd {
            AttestCmd::Verify => cmd_attest::verify(&repo_root),
            AttestCmd::Log { limit, json } => cmd_attest::log(&repo_root, limit, json),
        },
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
        Command::Status => cmd_status::execute(&repo_root),
    }
}
