//! Dump and load subcommand logic: each operates on a single configured tree, reading and
//! writing its leaf facts through a JSON snapshot file rather than a live committee process.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use committee_core::{CommitteeObjectKind, OrderState, OrderWire, PositionState, PositionWire, VaultState, VaultWire};
use committee_patricia::{dump_tree, load_tree, HashOutput, MerkleTree, PedersenHasher};

use crate::errors::{CliError, CliResult};
use crate::snapshot;

/// The tree a dump or load operates on: which leaf kind it holds, its configured height, and the
/// snapshot file standing in for the committee's persistent fact store.
pub struct TreeArgs {
    pub kind: CommitteeObjectKind,
    pub height: u32,
    pub storage_path: PathBuf,
}

/// Renders one CSV record through the `csv` crate rather than hand-joining with commas, so a
/// leaf's JSON payload can safely contain commas or quotes of its own.
fn csv_row(fields: &[String]) -> String {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(fields).expect("in-memory csv write cannot fail");
    let bytes = writer.into_inner().expect("in-memory csv writer has no pending I/O");
    String::from_utf8(bytes).expect("csv writer output is valid utf8").trim_end().to_string()
}

/// Parses a leaves file as `(leaf_index, json_payload)` rows, in the same two-column shape
/// `csv_row` writes.
async fn read_leaf_rows(path: &Path) -> CliResult<Vec<(u64, String)>> {
    let content =
        tokio::fs::read_to_string(path).await.map_err(|source| CliError::Io { path: path.display().to_string(), source })?;
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let index_field = record.get(0).ok_or_else(|| CliError::MalformedField {
            row,
            field: "index",
            message: "missing column".to_string(),
        })?;
        let index: u64 = index_field.parse().map_err(|_| CliError::MalformedField {
            row,
            field: "index",
            message: format!("'{index_field}' is not a valid leaf index"),
        })?;
        let payload = record.get(1).ok_or_else(|| CliError::MalformedField {
            row,
            field: "payload",
            message: "missing column".to_string(),
        })?;
        rows.push((index, payload.to_string()));
    }
    Ok(rows)
}

/// Dumps the tree rooted at `root` (at `args.height`) into `leaves_path`, and optionally every
/// visited node's `(array_index, hash)` into `nodes_path`. Leaf facts are read from the snapshot
/// at `args.storage_path`; it is left untouched.
pub async fn dump(args: TreeArgs, root: &str, nodes_path: Option<PathBuf>, leaves_path: PathBuf) -> CliResult<()> {
    let root = HashOutput::from_hex(root).ok_or_else(|| CliError::InvalidRoot(root.to_string()))?;
    let store = snapshot::load(&args.storage_path).await?;
    let hasher = PedersenHasher;
    let tree = MerkleTree { root, height: args.height };

    let mut nodes_file = match &nodes_path {
        Some(path) => {
            Some(std::fs::File::create(path).map_err(|source| CliError::Io { path: path.display().to_string(), source })?)
        }
        None => None,
    };
    let mut leaves_file = std::fs::File::create(&leaves_path)
        .map_err(|source| CliError::Io { path: leaves_path.display().to_string(), source })?;

    let nodes_writer: Option<&mut dyn std::io::Write> = nodes_file.as_mut().map(|f| f as &mut dyn std::io::Write);
    let leaves_writer: Option<&mut dyn std::io::Write> = Some(&mut leaves_file as &mut dyn std::io::Write);

    match args.kind {
        CommitteeObjectKind::Vault | CommitteeObjectKind::RollupVault => {
            dump_tree::<VaultState>(&store, &hasher, &tree, 1, nodes_writer, leaves_writer, |index, leaf| {
                let wire = VaultWire::from(*leaf);
                csv_row(&[index.to_string(), serde_json::to_string(&wire).expect("vault wire serializes")])
            })
            .await?;
        }
        CommitteeObjectKind::Order => {
            dump_tree::<OrderState>(&store, &hasher, &tree, 1, nodes_writer, leaves_writer, |index, leaf| {
                let wire = OrderWire::from(*leaf);
                csv_row(&[index.to_string(), serde_json::to_string(&wire).expect("order wire serializes")])
            })
            .await?;
        }
        CommitteeObjectKind::Position => {
            dump_tree::<PositionState>(&store, &hasher, &tree, 1, nodes_writer, leaves_writer, |index, leaf| {
                let wire = PositionWire::from(leaf.clone());
                csv_row(&[index.to_string(), serde_json::to_string(&wire).expect("position wire serializes")])
            })
            .await?;
        }
    }
    leaves_file.flush().map_err(|source| CliError::Io { path: leaves_path.display().to_string(), source })?;
    Ok(())
}

/// Rebuilds a tree of `args.height` from `leaves_path`, persists the updated leaf facts back to
/// `args.storage_path`, and returns the resulting root.
pub async fn load(args: TreeArgs, leaves_path: PathBuf) -> CliResult<HashOutput> {
    let hasher = PedersenHasher;
    let store = snapshot::load(&args.storage_path).await?;
    let rows = read_leaf_rows(&leaves_path).await?;

    let root = match args.kind {
        CommitteeObjectKind::Vault | CommitteeObjectKind::RollupVault => {
            let leaves = rows
                .into_iter()
                .map(|(index, json)| {
                    let wire: VaultWire = serde_json::from_str(&json)?;
                    Ok((index, VaultState::try_from(wire)?))
                })
                .collect::<CliResult<Vec<_>>>()?;
            load_tree::<VaultState>(&store, &hasher, args.height, leaves).await?.root
        }
        CommitteeObjectKind::Order => {
            let leaves = rows
                .into_iter()
                .map(|(index, json)| {
                    let wire: OrderWire = serde_json::from_str(&json)?;
                    Ok((index, OrderState::from(wire)))
                })
                .collect::<CliResult<Vec<_>>>()?;
            load_tree::<OrderState>(&store, &hasher, args.height, leaves).await?.root
        }
        CommitteeObjectKind::Position => {
            let leaves = rows
                .into_iter()
                .map(|(index, json)| {
                    let wire: PositionWire = serde_json::from_str(&json)?;
                    Ok((index, PositionState::from(wire)))
                })
                .collect::<CliResult<Vec<_>>>()?;
            load_tree::<PositionState>(&store, &hasher, args.height, leaves).await?.root
        }
    };

    snapshot::save(&args.storage_path, &store).await?;
    Ok(root)
}
