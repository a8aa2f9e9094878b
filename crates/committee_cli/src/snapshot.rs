use std::collections::BTreeMap;
use std::path::Path;

use committee_storage::MapStorage;

use crate::errors::{CliError, CliResult};

/// Loads a `MapStorage` from a JSON snapshot file (`hex(key) -> hex(value)`), or an empty store
/// if the path does not exist yet (the first `load-state` run against a fresh store).
pub async fn load(path: &Path) -> CliResult<MapStorage> {
    if !path.exists() {
        return Ok(MapStorage::new());
    }
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io { path: path.display().to_string(), source })?;
    let entries: BTreeMap<String, String> =
        serde_json::from_str(&contents).map_err(|source| CliError::Snapshot { path: path.display().to_string(), source })?;
    let mut decoded = std::collections::HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        decoded.insert(hex::decode(key)?, hex::decode(value)?);
    }
    Ok(MapStorage::from_entries(decoded))
}

/// Writes the full contents of `store` back to `path` as a JSON snapshot.
pub async fn save(path: &Path, store: &MapStorage) -> CliResult<()> {
    let snapshot: BTreeMap<String, String> =
        store.snapshot().await.into_iter().map(|(k, v)| (hex::encode(k), hex::encode(v))).collect();
    let contents = serde_json::to_string_pretty(&snapshot).expect("snapshot map serializes");
    tokio::fs::write(path, contents).await.map_err(|source| CliError::Io { path: path.display().to_string(), source })
}
