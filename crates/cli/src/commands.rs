//! Dispatches parsed CLI actions against a freshly seeded in-process
//! world: one [`oms_branch::BranchRegistry`], one in-memory lock/version/
//! outbox backend triple, wired the same way a coordinator deployment
//! would wire them.

use crate::cli::{BranchAction, CompactAction, ConsumerAction, MergeAction, OutboxAction};
use oms_branch::BranchRegistry;
use oms_consumer::{ConsumerConfig, ConsumerState, IdempotentConsumer};
use oms_coordinator::{Coordinator, CoordinatorConfig, MutationRequest};
use oms_core::content::Content;
use oms_core::resource::{BranchName, ResourceRef, ResourceType};
use oms_core::timestamp::Timestamp;
use oms_core::version::ChangeType;
use oms_core::{OmsError, Result};
use oms_merge::{compact, verify_reachability, merge, CommitMeta, ResourceState};
use oms_storage::{InMemoryLockBackend, InMemoryOutboxBackend, InMemoryVersionStore};
use oms_validate::ValidationPipeline;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

/// Splits a `storage_key()` string (`"<branch>/<type>/<id>"`) back into its
/// parts. The CLI is the only place this reverse mapping is needed — the
/// core never round-trips a key back into a [`oms_core::resource::ResourceRef`]
/// because the coordinator always carries the structured ref alongside it.
fn parse_storage_key(key: &str, branch: BranchName) -> Option<oms_core::resource::ResourceRef> {
    let mut parts = key.splitn(3, '/');
    let _branch = parts.next()?;
    let resource_type = ResourceType::from_str(parts.next()?).ok()?;
    let resource_id = parts.next()?;
    Some(oms_core::resource::ResourceRef::new(resource_type, resource_id, branch))
}

pub fn run_branch(action: BranchAction, now: Timestamp) -> Result<Value> {
    let registry = BranchRegistry::new("operator", now);
    match action {
        BranchAction::Create { name, parent, actor } => {
            let name = BranchName::new(name).map_err(|e| OmsError::ValidationFailed {
                resource: oms_core::resource::ResourceRef::new(ResourceType::Branch, "new", BranchName::main()),
                reason: e.to_string(),
            })?;
            let parent = BranchName::new(parent).map_err(|e| OmsError::ValidationFailed {
                resource: oms_core::resource::ResourceRef::new(ResourceType::Branch, "parent", BranchName::main()),
                reason: e.to_string(),
            })?;
            let branch = registry.create("auto", name, &parent, actor, now)?;
            Ok(json!({ "id": branch.id, "name": branch.name.as_str(), "parent": branch.parent_branch.as_ref().map(|b| b.as_str()) }))
        }
        BranchAction::Lock { name } => {
            let name = BranchName::new(name).map_err(|_| OmsError::NotFound {
                resource: oms_core::resource::ResourceRef::new(ResourceType::Branch, "invalid", BranchName::main()),
            })?;
            registry.lock_for_merge(&name)?;
            Ok(json!({ "name": name.as_str(), "state": "locked_for_merge" }))
        }
        BranchAction::Archive { name } => {
            let name = BranchName::new(name).map_err(|_| OmsError::NotFound {
                resource: oms_core::resource::ResourceRef::new(ResourceType::Branch, "invalid", BranchName::main()),
            })?;
            registry.archive(&name)?;
            Ok(json!({ "name": name.as_str(), "state": "archived" }))
        }
        BranchAction::List => {
            let branches: Vec<Value> = registry
                .list()
                .into_iter()
                .map(|b| json!({ "name": b.name.as_str(), "state": format!("{:?}", b.state) }))
                .collect();
            Ok(json!({ "branches": branches }))
        }
    }
}

pub fn run_merge(action: MergeAction, now: Timestamp) -> Result<Value> {
    match action {
        MergeAction::Plan { left, right } => {
            let registry = BranchRegistry::new("operator", now);
            let left = BranchName::new(left).map_err(branch_name_error)?;
            let right = BranchName::new(right).map_err(branch_name_error)?;
            let change_set = registry.branch_diff(&left, &right)?;
            let describe = |key: &str| -> Value {
                match parse_storage_key(key, left.clone()) {
                    Some(resource) => json!({ "resource": resource.storage_key(), "type": resource.resource_type.as_str() }),
                    None => json!({ "resource": key }),
                }
            };
            Ok(json!({
                "only_in_left": change_set.only_in_left.iter().map(|d| describe(&d.resource_key)).collect::<Vec<_>>(),
                "only_in_right": change_set.only_in_right.iter().map(|d| describe(&d.resource_key)).collect::<Vec<_>>(),
                "diverged": change_set.diverged.iter().map(|d| describe(&d.resource_key)).collect::<Vec<_>>(),
            }))
        }
        MergeAction::Apply { left, right, target, actor } => {
            let left = BranchName::new(left).map_err(branch_name_error)?;
            let right = BranchName::new(right).map_err(branch_name_error)?;
            let target = BranchName::new(target).map_err(branch_name_error)?;

            let branches = BranchRegistry::new("operator", now);
            ensure_branch(&branches, &left, &actor, now)?;
            ensure_branch(&branches, &right, &actor, now)?;
            ensure_branch(&branches, &target, &actor, now)?;
            let branches = Arc::new(branches);

            let coordinator = Coordinator::new(
                Arc::new(InMemoryLockBackend::new()),
                Arc::new(InMemoryVersionStore::new()),
                branches,
                Arc::new(InMemoryOutboxBackend::new()),
                ValidationPipeline::new(),
                CoordinatorConfig::default(),
                HashSet::new(),
            );

            // Seed one resource whose demo branch state demonstrates a
            // clean (non-conflicting) merge: the base version on `main`,
            // touched only on `left`.
            let base_ref = ResourceRef::new(ResourceType::Property, "status", BranchName::main());
            coordinator.mutate(seed_request(&base_ref, json!({"label": "Status", "type": "string"}), ChangeType::Created, &actor), now)?;
            let base_version = coordinator.resource_version(&base_ref)?
                .ok_or_else(|| OmsError::Internal("seeded resource missing after mutate".to_string()))?;

            let left_ref = ResourceRef::new(ResourceType::Property, "status", left.clone());
            coordinator.mutate(seed_request(&left_ref, json!({"label": "Current Status", "type": "string"}), ChangeType::Updated, &actor), now)?;
            let left_version = coordinator.resource_version(&left_ref)?
                .ok_or_else(|| OmsError::Internal("seeded resource missing after mutate".to_string()))?;

            // The merge identity both sides are matched under is carried on
            // `target` — `apply_merge` would overwrite it there anyway.
            let identity = ResourceRef::new(ResourceType::Property, "status", target.clone());
            let base = vec![ResourceState {
                resource: identity.clone(),
                content_hash: Some(base_version.content_hash.clone()),
                content: Some(base_version.content.as_value().clone()),
            }];
            let branch_a = vec![ResourceState {
                resource: identity.clone(),
                content_hash: Some(left_version.content_hash.clone()),
                content: Some(left_version.content.as_value().clone()),
            }];
            // `right` never touched this resource: its side of the merge
            // matches base exactly.
            let branch_b = vec![ResourceState {
                resource: identity,
                content_hash: Some(base_version.content_hash),
                content: Some(base_version.content.as_value().clone()),
            }];

            let plan = merge(&base, &branch_a, &branch_b);
            let outcomes = coordinator.apply_merge(&plan, &target, &actor, now)?;
            Ok(json!({
                "blocked": plan.is_blocked(),
                "resolved": plan.resolved.len(),
                "conflicts": plan.conflicts.len(),
                "written": outcomes.len(),
            }))
        }
    }
}

pub fn run_outbox(action: OutboxAction, now: Timestamp) -> Result<Value> {
    let backend = InMemoryOutboxBackend::new();
    match action {
        OutboxAction::Requeue { sequence } => {
            use oms_storage::OutboxBackend;
            let moved = backend.mark_failed(sequence, "requeued by operator".to_string(), now)?;
            Ok(json!({ "sequence": sequence, "requeued": moved }))
        }
        OutboxAction::DeadLetter => {
            use oms_storage::OutboxBackend;
            let entries = backend.list_dead_letter()?;
            Ok(json!({ "count": entries.len() }))
        }
    }
}

pub fn run_consumer(action: ConsumerAction, now: Timestamp) -> Result<Value> {
    match action {
        ConsumerAction::Reset { consumer_id } => {
            let state = ConsumerState::new(consumer_id.clone(), "1");
            let consumer = IdempotentConsumer::resume(ConsumerConfig::default(), state, oms_consumer::HandlerRegistry::default());
            let info = consumer.info();
            let _ = now;
            Ok(json!({ "consumer_id": info.consumer_id, "events_processed": info.events_processed, "is_healthy": info.is_healthy }))
        }
    }
}

pub fn run_compact(action: CompactAction) -> Result<Value> {
    match action {
        CompactAction::Run { chain, max_chain_length, apply } => {
            let raw = std::fs::read_to_string(&chain).map_err(|e| OmsError::Internal(e.to_string()))?;
            let commits: Vec<CommitMeta> = serde_json::from_str(&raw).map_err(|e| OmsError::Internal(e.to_string()))?;
            let dry_run = !apply;
            let (result, to_persist) = compact(&commits, max_chain_length, dry_run);
            let reachable = verify_reachability(&commits, &result);
            if let Some(persisted) = &to_persist {
                let serialized = serde_json::to_string_pretty(persisted).map_err(|e| OmsError::Internal(e.to_string()))?;
                std::fs::write(&chain, serialized).map_err(|e| OmsError::Internal(e.to_string()))?;
            }
            Ok(json!({
                "dry_run": dry_run,
                "kept": result.kept.len(),
                "collapsed_runs": result.summaries.len(),
                "reachable": reachable,
                "applied": to_persist.is_some(),
            }))
        }
    }
}

fn branch_name_error(e: oms_core::resource::BranchNameError) -> OmsError {
    OmsError::ValidationFailed {
        resource: oms_core::resource::ResourceRef::new(ResourceType::Branch, "invalid", BranchName::main()),
        reason: e.to_string(),
    }
}

/// Fork `name` from `main` if it does not already exist in `registry`.
fn ensure_branch(registry: &BranchRegistry, name: &BranchName, actor: &str, now: Timestamp) -> Result<()> {
    if name.is_main() || registry.get(name).is_ok() {
        return Ok(());
    }
    registry.create(name.as_str(), name.clone(), &BranchName::main(), actor, now)?;
    Ok(())
}

fn seed_request(resource: &ResourceRef, content: Value, change_type: ChangeType, actor: &str) -> MutationRequest {
    MutationRequest {
        resource: resource.clone(),
        content: Content::new(content).expect("demo payload is within content limits"),
        change_type,
        actor: actor.to_string(),
        if_match: None,
        fields_changed: vec!["label".to_string()],
        change_summary: Some("cli merge demo seed".to_string()),
        correlation_id: None,
    }
}
