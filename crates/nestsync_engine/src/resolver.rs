//! Conflict resolution.
//!
//! The resolver is a pure function of the local version, the remote
//! version, and the common ancestor (the last server-acknowledged
//! version, when known). Identical inputs always produce the identical
//! resolution, independent of call order, because pulls and pushes may
//! interleave across retries.

use nestsync_protocol::{MergePolicy, Record, Resolution};
use std::collections::BTreeSet;

/// Resolves divergent record versions.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    policy: MergePolicy,
}

impl Resolver {
    /// Creates a resolver with the given policy for overlapping edits.
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    /// Returns the configured policy.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Returns true if both sides changed since the common ancestor.
    ///
    /// This predicate drives conflict auditing; it is independent of how
    /// the conflict ends up resolved.
    pub fn diverged(local: &Record, remote: &Record, base: Option<&Record>) -> bool {
        remote_changed(local, remote) && local_changed(local, base)
    }

    /// Resolves `local` against `remote`.
    ///
    /// Precedence:
    /// 1. A tombstone on either side wins; a delete cannot be
    ///    resurrected by a concurrent update.
    /// 2. If only one side changed since the ancestor, that side wins.
    /// 3. Disjoint field edits merge.
    /// 4. Overlapping edits resolve by last-writer-wins on the mutation
    ///    timestamp (ties to remote), or are flagged for manual
    ///    resolution under [`MergePolicy::Manual`].
    pub fn resolve(&self, local: &Record, remote: &Record, base: Option<&Record>) -> Resolution {
        let remote_newer = remote_changed(local, remote);

        if local.deleted || remote.deleted {
            if remote.deleted {
                // A stale remote tombstone the local record already
                // reflects is an echo, not a change.
                return if remote_newer {
                    Resolution::KeepRemote
                } else {
                    Resolution::KeepLocal
                };
            }
            return Resolution::KeepLocal;
        }

        if !remote_newer {
            return Resolution::KeepLocal;
        }
        if !local_changed(local, base) {
            return Resolution::KeepRemote;
        }

        self.merge(local, remote, base)
    }

    fn merge(&self, local: &Record, remote: &Record, base: Option<&Record>) -> Resolution {
        let empty = Default::default();
        let base_fields = base.map(|b| &b.fields).unwrap_or(&empty);

        let local_edits = edited_keys(local, base_fields);
        let remote_edits = edited_keys(remote, base_fields);

        let overlap: BTreeSet<&String> = local_edits
            .intersection(&remote_edits)
            .filter(|key| local.fields.get(**key) != remote.fields.get(**key))
            .copied()
            .collect();

        if !overlap.is_empty() && !self.policy.auto_resolves() {
            return Resolution::Manual;
        }

        let mut fields = base_fields.clone();
        for key in &remote_edits {
            match remote.fields.get(*key) {
                Some(value) => {
                    fields.insert((*key).clone(), value.clone());
                }
                None => {
                    fields.remove(*key);
                }
            }
        }
        for key in &local_edits {
            match local.fields.get(*key) {
                Some(value) => {
                    fields.insert((*key).clone(), value.clone());
                }
                None => {
                    fields.remove(*key);
                }
            }
        }

        // Overlapping keys were just set to the local value; rewrite
        // them with the winner's value. Ties go to the remote side, so
        // the outcome is the same on every replica.
        let remote_wins = remote.modified_at >= local.modified_at;
        if remote_wins {
            for key in &overlap {
                match remote.fields.get(*key) {
                    Some(value) => {
                        fields.insert((*key).clone(), value.clone());
                    }
                    None => {
                        fields.remove(*key);
                    }
                }
            }
        }

        Resolution::Merge(Record {
            id: local.id,
            entity_type: local.entity_type.clone(),
            fields,
            modified_at: local.modified_at.max(remote.modified_at),
            remote_rev: remote.remote_rev,
            deleted: false,
        })
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}

/// Did the remote version move past what the local record reflects?
fn remote_changed(local: &Record, remote: &Record) -> bool {
    remote.remote_rev > local.remote_rev
}

/// Did the local version change since the ancestor?
///
/// Without an ancestor, a never-synced record is a local creation and
/// counts as changed; a synced record with no shadow is assumed clean.
fn local_changed(local: &Record, base: Option<&Record>) -> bool {
    match base {
        Some(base) => local.fields != base.fields || local.deleted != base.deleted,
        None => local.remote_rev.is_none(),
    }
}

/// Keys whose value differs from the ancestor, including removals.
fn edited_keys<'a>(
    record: &'a Record,
    base_fields: &'a std::collections::BTreeMap<String, nestsync_protocol::FieldValue>,
) -> BTreeSet<&'a String> {
    let mut keys = BTreeSet::new();
    for (key, value) in &record.fields {
        if base_fields.get(key) != Some(value) {
            keys.insert(key);
        }
    }
    for key in base_fields.keys() {
        if !record.fields.contains_key(key) {
            keys.insert(key);
        }
    }
    keys
}
