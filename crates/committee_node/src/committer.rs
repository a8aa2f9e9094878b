use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use committee_core::{
    claim_hash, compute_initial_batch_info, empty_root_for_kind, read_batch_info, read_next_batch_id, write_batch_info,
    write_next_batch_id, ClaimInputs, ClaimRole, CommitteeBatchInfo, CommitteeObjectConfig, CommitteeObjectKind, CoreResult,
    ObjectModifications, OrderState, PositionState, VaultState,
};
use committee_patricia::{HashOutput, Hasher, MerkleTree};
use committee_signer::Signer;
use committee_storage::Storage;
use futures::future::try_join_all;

use crate::errors::{BatchIterationError, BatchIterationResult};
use crate::gateway_port::BatchGateway;
use crate::validation::ValidationHook;

/// The sentinel an operator's declared `order` root carries when it predates a tree-topology
/// migration: `"DEADBEEF"` repeated eight times (32 bytes), lowercased here since every hex
/// comparison in this crate is lowercase.
pub const OBSOLETE_ORDER_TREE_ROOT: &str = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IterationOutcome {
    NotReady,
    Advanced,
}

/// Wires storage, the hasher, the gateway, the signer, and the configured named objects together
/// behind the per-batch validation loop. Holds no business state itself beyond `stopped`; every
/// durable value (batch info, `next_batch_id`) lives in `store`.
pub struct Committer {
    store: Arc<dyn Storage>,
    hasher: Arc<dyn Hasher>,
    gateway: Arc<dyn BatchGateway>,
    signer: Arc<dyn Signer>,
    validation_hook: Arc<dyn ValidationHook>,
    objects: Vec<CommitteeObjectConfig>,
    validate_orders: bool,
    validate_rollup: Option<bool>,
    polling_interval: Duration,
    stopped: Arc<AtomicBool>,
}

impl Committer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Storage>,
        hasher: Arc<dyn Hasher>,
        gateway: Arc<dyn BatchGateway>,
        signer: Arc<dyn Signer>,
        validation_hook: Arc<dyn ValidationHook>,
        objects: Vec<CommitteeObjectConfig>,
        validate_orders: bool,
        validate_rollup: Option<bool>,
        polling_interval: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            gateway,
            signer,
            validation_hook,
            objects,
            validate_orders,
            validate_rollup,
            polling_interval,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flips the stop flag; the running loop exits after its current iteration completes.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Writes the initial batch (`batch_id = -1`, `sequence_number = -1`) if it isn't already
    /// present, and ensures `next_batch_id` is initialized. Idempotent: safe to call on every
    /// process start.
    pub async fn bootstrap(&self) -> BatchIterationResult<()> {
        if read_batch_info(self.store.as_ref(), -1).await?.is_none() {
            let info = compute_initial_batch_info(&self.objects, self.store.as_ref(), self.hasher.as_ref()).await?;
            write_batch_info(self.store.as_ref(), -1, &info).await?;
        }
        Ok(())
    }

    /// Runs iterations until `stop()` is called. Any iteration error is logged and followed by a
    /// sleep for `polling_interval`; the loop then retries the same `next_batch_id`.
    pub async fn run(&self) {
        while !self.is_stopped() {
            let batch_id = match read_next_batch_id(self.store.as_ref()).await {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!(error = %err, "failed to read next_batch_id");
                    tokio::time::sleep(self.polling_interval).await;
                    continue;
                }
            };
            match self.run_iteration(batch_id).await {
                Ok(IterationOutcome::Advanced) => {}
                Ok(IterationOutcome::NotReady) => tokio::time::sleep(self.polling_interval).await,
                Err(err) => {
                    tracing::error!(error = %err, batch_id, "batch iteration failed");
                    tokio::time::sleep(self.polling_interval).await;
                }
            }
        }
    }

    /// Drives a single batch through the full validator pipeline: fetch, validate, recompute,
    /// compare, persist, sign, submit, advance.
    pub async fn run_iteration(&self, batch_id: u64) -> BatchIterationResult<IterationOutcome> {
        let response = self.gateway.get_batch_data(batch_id, self.validate_rollup).await?;
        let Some(state_update) = response.update else {
            return Ok(IterationOutcome::NotReady);
        };

        if !self.validation_hook.is_valid(&state_update).await {
            return Err(BatchIterationError::ValidationRejected);
        }

        let prev_info = read_batch_info(self.store.as_ref(), state_update.prev_batch_id)
            .await?
            .ok_or(committee_core::CoreError::MissingPrevBatchInfo(state_update.prev_batch_id))?;

        let mut prev_roots = prev_info.merkle_roots.clone();
        for object in &self.objects {
            if object.kind == CommitteeObjectKind::RollupVault && !prev_roots.contains_key(&object.name) {
                let root = empty_root_for_kind(object.kind, object.merkle_height, self.store.as_ref(), self.hasher.as_ref()).await?;
                prev_roots.insert(object.name.clone(), root);
            }
        }

        let validated: HashSet<&str> = self
            .objects
            .iter()
            .map(|o| o.name.as_str())
            .filter(|name| *name != "order" || self.validate_orders)
            .filter(|name| *name != "rollup_vault" || self.validate_rollup != Some(false))
            .collect();

        let state_update_ref = &state_update;
        let computed: Vec<(String, HashOutput)> = try_join_all(self.objects.iter().filter(|o| validated.contains(o.name.as_str())).map(
            |object| {
                let name = object.name.clone();
                let kind = object.kind;
                let height = object.merkle_height;
                let prev_root = *prev_roots.get(&object.name).expect("configured object has a previous root");
                let store = Arc::clone(&self.store);
                let hasher = Arc::clone(&self.hasher);
                async move {
                    let modifications = state_update_ref.object_modifications(&name, kind)?;
                    let new_root = apply_modifications(store.as_ref(), hasher.as_ref(), prev_root, height, modifications).await?;
                    Ok::<(String, HashOutput), BatchIterationError>((name, new_root))
                }
            },
        ))
        .await?;
        let computed_map: BTreeMap<String, HashOutput> = computed.into_iter().collect();

        let mut new_roots = BTreeMap::new();
        for object in &self.objects {
            let declared_hex = state_update
                .declared_root(&object.name)
                .ok_or_else(|| BatchIterationError::InvalidDeclaredRoot(object.name.clone()))?;
            let declared = HashOutput::from_hex(declared_hex)
                .ok_or_else(|| BatchIterationError::InvalidDeclaredRoot(object.name.clone()))?;

            let is_obsolete_order = object.name == "order" && declared_hex.eq_ignore_ascii_case(OBSOLETE_ORDER_TREE_ROOT);
            if is_obsolete_order {
                new_roots.insert(object.name.clone(), declared);
                continue;
            }

            if let Some(&computed_root) = computed_map.get(&object.name) {
                if computed_root != declared {
                    return Err(BatchIterationError::RootMismatch {
                        object: object.name.clone(),
                        computed: computed_root.to_hex(),
                        declared: declared.to_hex(),
                    });
                }
                new_roots.insert(object.name.clone(), computed_root);
            } else {
                new_roots.insert(object.name.clone(), declared);
            }
        }

        let new_info = CommitteeBatchInfo { merkle_roots: new_roots.clone(), sequence_number: prev_info.sequence_number + 1 };
        write_batch_info(self.store.as_ref(), batch_id as i64, &new_info).await?;

        let vaults_object = self
            .objects
            .iter()
            .find(|o| o.kind.claim_role() == ClaimRole::Vaults)
            .ok_or(BatchIterationError::MissingVaultsObject)?;
        let trades_object = self
            .objects
            .iter()
            .find(|o| o.kind.claim_role() == ClaimRole::Trades)
            .ok_or(BatchIterationError::MissingTradesObject)?;
        let vaults_root = *new_roots.get(&vaults_object.name).expect("vaults object has a new root");
        let trades_root = *new_roots.get(&trades_object.name).expect("trades object has a new root");

        let claim = claim_hash(
            ClaimInputs {
                vaults_root,
                vaults_height: vaults_object.merkle_height,
                trades_root,
                trades_height: trades_object.merkle_height,
                sequence_number: new_info.sequence_number,
            },
            self.hasher.as_ref(),
        );

        let signature = self.signer.sign(&claim.to_bytes()).await;
        self.gateway
            .approve_new_roots(batch_id as i64, &signature.to_hex(), &self.signer.address().to_hex(), &claim.to_hex())
            .await?;

        write_next_batch_id(self.store.as_ref(), batch_id + 1).await?;
        tracing::info!(batch_id, sequence_number = new_info.sequence_number, "batch validated and signed");
        Ok(IterationOutcome::Advanced)
    }
}

async fn apply_modifications(
    store: &dyn Storage,
    hasher: &dyn Hasher,
    prev_root: HashOutput,
    height: u32,
    modifications: ObjectModifications,
) -> CoreResult<HashOutput> {
    let tree = MerkleTree { root: prev_root, height };
    let new_tree = match modifications {
        ObjectModifications::Vault(entries) => tree.update::<VaultState>(store, hasher, entries).await?,
        ObjectModifications::Order(entries) => tree.update::<OrderState>(store, hasher, entries).await?,
        ObjectModifications::Position(entries) => tree.update::<PositionState>(store, hasher, entries).await?,
    };
    Ok(new_tree.root)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use committee_core::{BatchDataResponse, StateUpdate, VaultWire};
    use committee_gateway::GatewayError;
    use committee_patricia::PedersenHasher;
    use committee_signer::Secp256k1Signer;
    use committee_storage::MapStorage;
    use pretty_assertions::assert_eq;
    use starknet_types_core::felt::Felt;
    use tokio::sync::Mutex as AsyncMutex;

    use super::*;
    use crate::validation::AlwaysValid;

    const TEST_KEY_HEX: &str = "4646464646464646464646464646464646464646464646464646464646464";

    struct FakeGateway {
        responses: AsyncMutex<VecDeque<BatchDataResponse>>,
        approvals: AsyncMutex<Vec<(i64, String, String, String)>>,
    }

    impl FakeGateway {
        fn new(responses: Vec<BatchDataResponse>) -> Self {
            Self { responses: AsyncMutex::new(responses.into()), approvals: AsyncMutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl BatchGateway for FakeGateway {
        async fn get_batch_data(&self, _batch_id: u64, _validate_rollup: Option<bool>) -> Result<BatchDataResponse, GatewayError> {
            Ok(self.responses.lock().await.pop_front().unwrap_or(BatchDataResponse { update: None }))
        }

        async fn approve_new_roots(
            &self,
            batch_id: i64,
            signature_hex: &str,
            member_key_hex: &str,
            claim_hash_hex: &str,
        ) -> Result<(), GatewayError> {
            self.approvals.lock().await.push((
                batch_id,
                signature_hex.to_string(),
                member_key_hex.to_string(),
                claim_hash_hex.to_string(),
            ));
            Ok(())
        }
    }

    fn vault_order_objects() -> Vec<CommitteeObjectConfig> {
        vec![
            CommitteeObjectConfig { name: "vault".into(), kind: CommitteeObjectKind::Vault, merkle_height: 4 },
            CommitteeObjectConfig { name: "order".into(), kind: CommitteeObjectKind::Order, merkle_height: 4 },
        ]
    }

    fn make_committer(
        store: &MapStorage,
        gateway: Arc<dyn BatchGateway>,
        objects: Vec<CommitteeObjectConfig>,
        validate_orders: bool,
        validate_rollup: Option<bool>,
    ) -> Committer {
        Committer::new(
            Arc::new(store.clone()),
            Arc::new(PedersenHasher),
            gateway,
            Arc::new(Secp256k1Signer::from_hex(TEST_KEY_HEX).unwrap()),
            Arc::new(AlwaysValid),
            objects,
            validate_orders,
            validate_rollup,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn bootstrap_creates_the_initial_batch() {
        let store = MapStorage::new();
        let gateway: Arc<dyn BatchGateway> = Arc::new(FakeGateway::new(vec![]));
        let committer = make_committer(&store, gateway, vault_order_objects(), true, None);
        committer.bootstrap().await.unwrap();
        let info = read_batch_info(&store, -1).await.unwrap().unwrap();
        assert_eq!(info.sequence_number, -1);
        assert_eq!(info.merkle_roots.len(), 2);
    }

    #[tokio::test]
    async fn happy_path_end_to_end() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let objects = vault_order_objects();

        let initial = compute_initial_batch_info(&objects, &store, &hasher).await.unwrap();
        write_batch_info(&store, -1, &initial).await.unwrap();
        write_next_batch_id(&store, 0).await.unwrap();

        let vault_tree = MerkleTree { root: *initial.merkle_roots.get("vault").unwrap(), height: 4 };
        let new_vault_tree = vault_tree
            .update::<VaultState>(&store, &hasher, vec![(1, VaultState::new(Felt::from(7u64), Felt::from(8u64), 100).unwrap())])
            .await
            .unwrap();

        let mut vaults = BTreeMap::new();
        vaults.insert(1u64, VaultWire { stark_key: Felt::from(7u64), token: Felt::from(8u64), balance: 100 });

        let state_update = StateUpdate {
            prev_batch_id: -1,
            vaults: Some(vaults),
            orders: Some(BTreeMap::new()),
            rollup_vaults: None,
            positions: None,
            vault_root: Some(new_vault_tree.root.to_hex()),
            order_root: Some(initial.merkle_roots.get("order").unwrap().to_hex()),
            rollup_vault_root: None,
            position_root: None,
        };

        let gateway = Arc::new(FakeGateway::new(vec![BatchDataResponse { update: Some(state_update) }]));
        let committer = make_committer(&store, gateway.clone(), objects, true, None);

        let outcome = committer.run_iteration(0).await.unwrap();
        assert_eq!(outcome, IterationOutcome::Advanced);
        assert_eq!(gateway.approvals.lock().await.len(), 1);
        assert_eq!(read_next_batch_id(&store).await.unwrap(), 1);

        let new_info = read_batch_info(&store, 0).await.unwrap().unwrap();
        assert_eq!(new_info.sequence_number, 0);
        assert_eq!(new_info.merkle_roots.get("vault"), Some(&new_vault_tree.root));
    }

    #[tokio::test]
    async fn corrupted_vault_data_is_rejected() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let objects = vault_order_objects();

        let initial = compute_initial_batch_info(&objects, &store, &hasher).await.unwrap();
        write_batch_info(&store, -1, &initial).await.unwrap();
        write_next_batch_id(&store, 0).await.unwrap();

        let vault_tree = MerkleTree { root: *initial.merkle_roots.get("vault").unwrap(), height: 4 };
        let full_update = vault_tree
            .update::<VaultState>(
                &store,
                &hasher,
                vec![
                    (1, VaultState::new(Felt::from(7u64), Felt::from(8u64), 100).unwrap()),
                    (2, VaultState::new(Felt::from(9u64), Felt::from(10u64), 50).unwrap()),
                ],
            )
            .await
            .unwrap();

        // The payload only carries the modification at index 1 — index 2 is silently dropped —
        // but the declared root still reflects both.
        let mut vaults = BTreeMap::new();
        vaults.insert(1u64, VaultWire { stark_key: Felt::from(7u64), token: Felt::from(8u64), balance: 100 });

        let state_update = StateUpdate {
            prev_batch_id: -1,
            vaults: Some(vaults),
            orders: Some(BTreeMap::new()),
            rollup_vaults: None,
            positions: None,
            vault_root: Some(full_update.root.to_hex()),
            order_root: Some(initial.merkle_roots.get("order").unwrap().to_hex()),
            rollup_vault_root: None,
            position_root: None,
        };

        let gateway = Arc::new(FakeGateway::new(vec![BatchDataResponse { update: Some(state_update) }]));
        let committer = make_committer(&store, gateway, objects, true, None);

        let err = committer.run_iteration(0).await.unwrap_err();
        assert_matches!(err, BatchIterationError::RootMismatch { ref object, .. } if object == "vault");
    }

    #[tokio::test]
    async fn validate_orders_false_accepts_a_corrupted_order_root_verbatim() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let objects = vault_order_objects();

        let initial = compute_initial_batch_info(&objects, &store, &hasher).await.unwrap();
        write_batch_info(&store, -1, &initial).await.unwrap();
        write_next_batch_id(&store, 0).await.unwrap();

        // An order root that does not correspond to any real update — with validate_orders=false
        // this must be accepted, not recomputed or compared.
        let bogus_order_root = HashOutput::from_bytes(&[0x42; 32]).to_hex();

        let state_update = StateUpdate {
            prev_batch_id: -1,
            vaults: Some(BTreeMap::new()),
            orders: Some(BTreeMap::new()),
            rollup_vaults: None,
            positions: None,
            vault_root: Some(initial.merkle_roots.get("vault").unwrap().to_hex()),
            order_root: Some(bogus_order_root.clone()),
            rollup_vault_root: None,
            position_root: None,
        };

        let gateway = Arc::new(FakeGateway::new(vec![BatchDataResponse { update: Some(state_update) }]));
        let committer = make_committer(&store, gateway.clone(), objects, false, None);

        let outcome = committer.run_iteration(0).await.unwrap();
        assert_eq!(outcome, IterationOutcome::Advanced);
        let new_info = read_batch_info(&store, 0).await.unwrap().unwrap();
        assert_eq!(new_info.merkle_roots.get("order").unwrap().to_hex(), bogus_order_root);
    }

    #[tokio::test]
    async fn rollup_vault_synthesizes_empty_root_when_missing_from_prev_info() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        // The previous batch info was written before rollup_vault was configured: it carries
        // only vault and order roots.
        let base_objects = vault_order_objects();
        let initial = compute_initial_batch_info(&base_objects, &store, &hasher).await.unwrap();
        write_batch_info(&store, -1, &initial).await.unwrap();
        write_next_batch_id(&store, 0).await.unwrap();

        let mut objects = base_objects;
        objects.push(CommitteeObjectConfig { name: "rollup_vault".into(), kind: CommitteeObjectKind::RollupVault, merkle_height: 4 });

        let empty_rollup_root = empty_root_for_kind(CommitteeObjectKind::RollupVault, 4, &store, &hasher).await.unwrap();

        let state_update = StateUpdate {
            prev_batch_id: -1,
            vaults: Some(BTreeMap::new()),
            orders: Some(BTreeMap::new()),
            rollup_vaults: Some(BTreeMap::new()),
            positions: None,
            vault_root: Some(initial.merkle_roots.get("vault").unwrap().to_hex()),
            order_root: Some(initial.merkle_roots.get("order").unwrap().to_hex()),
            rollup_vault_root: Some(empty_rollup_root.to_hex()),
            position_root: None,
        };

        let gateway = Arc::new(FakeGateway::new(vec![BatchDataResponse { update: Some(state_update) }]));
        let committer = make_committer(&store, gateway, objects, true, Some(true));

        let outcome = committer.run_iteration(0).await.unwrap();
        assert_eq!(outcome, IterationOutcome::Advanced);
        let new_info = read_batch_info(&store, 0).await.unwrap().unwrap();
        assert_eq!(new_info.merkle_roots.get("rollup_vault"), Some(&empty_rollup_root));
    }

    #[tokio::test]
    async fn legacy_batch_info_key_is_readable_by_run_iteration() {
        let store = MapStorage::new();
        let hasher = PedersenHasher;
        let objects = vault_order_objects();

        let initial = compute_initial_batch_info(&objects, &store, &hasher).await.unwrap();
        // Seed only the legacy key, as if written by the system this one interoperates with.
        let bytes = serde_json::to_vec(&initial).unwrap();
        store.set(b"committee_batch_info:-1".to_vec(), bytes).await.unwrap();
        write_next_batch_id(&store, 0).await.unwrap();

        let state_update = StateUpdate {
            prev_batch_id: -1,
            vaults: Some(BTreeMap::new()),
            orders: Some(BTreeMap::new()),
            rollup_vaults: None,
            positions: None,
            vault_root: Some(initial.merkle_roots.get("vault").unwrap().to_hex()),
            order_root: Some(initial.merkle_roots.get("order").unwrap().to_hex()),
            rollup_vault_root: None,
            position_root: None,
        };

        let gateway = Arc::new(FakeGateway::new(vec![BatchDataResponse { update: Some(state_update) }]));
        let committer = make_committer(&store, gateway, objects, true, None);

        let outcome = committer.run_iteration(0).await.unwrap();
        assert_eq!(outcome, IterationOutcome::Advanced);
        // The legacy key must have been migrated to the new key as a side effect of the read.
        assert!(store.get(b"new_committee_batch_info:-1").await.unwrap().is_some());
    }
}
