use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use committee_cli::{dump, load, TreeArgs};
use committee_core::CommitteeObjectKind;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Dump and reload a committee's Merkle-tree fact store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dumps a tree's leaves (and optionally its nodes) to CSV, reading facts from a snapshot.
    Dump {
        #[arg(long, value_enum)]
        kind: ObjectKindArg,
        #[arg(long)]
        height: u32,
        /// The tree's root, as hex (with or without a `0x` prefix).
        #[arg(long)]
        root: String,
        /// The JSON snapshot file standing in for the committee's fact store.
        #[arg(long)]
        storage: PathBuf,
        #[arg(long)]
        leaves_out: PathBuf,
        #[arg(long)]
        nodes_out: Option<PathBuf>,
    },
    /// Rebuilds a tree from a leaves CSV file, persists it to the snapshot, and prints the root.
    Load {
        #[arg(long, value_enum)]
        kind: ObjectKindArg,
        #[arg(long)]
        height: u32,
        #[arg(long)]
        storage: PathBuf,
        #[arg(long)]
        leaves_in: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectKindArg {
    Vault,
    Order,
    Position,
    RollupVault,
}

impl From<ObjectKindArg> for CommitteeObjectKind {
    fn from(arg: ObjectKindArg) -> Self {
        match arg {
            ObjectKindArg::Vault => CommitteeObjectKind::Vault,
            ObjectKindArg::Order => CommitteeObjectKind::Order,
            ObjectKindArg::Position => CommitteeObjectKind::Position,
            ObjectKindArg::RollupVault => CommitteeObjectKind::RollupVault,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Dump { kind, height, root, storage, leaves_out, nodes_out } => {
            let args = TreeArgs { kind: kind.into(), height, storage_path: storage };
            dump(args, &root, nodes_out, leaves_out.clone()).await?;
            tracing::info!(path = %leaves_out.display(), "wrote leaves");
        }
        Command::Load { kind, height, storage, leaves_in } => {
            let args = TreeArgs { kind: kind.into(), height, storage_path: storage };
            let root = load(args, leaves_in).await?;
            println!("{}", root.to_hex());
        }
    }
    Ok(())
}
