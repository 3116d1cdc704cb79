//! Conflict resolutions and audit records.

use crate::record::{EntityType, Record, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// The result of resolving divergent local and remote versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// The local version stands; the remote change is superseded.
    KeepLocal,
    /// The remote version replaces the local one.
    KeepRemote,
    /// Both sides' edits combine into the carried record.
    Merge(Record),
    /// Overlapping edits under a manual policy: the local version stays
    /// in place and the conflict is flagged for the user.
    Manual,
}

impl Resolution {
    /// Returns the audit tag for this resolution.
    pub fn kind(&self) -> ResolutionKind {
        match self {
            Resolution::KeepLocal => ResolutionKind::KeptLocal,
            Resolution::KeepRemote => ResolutionKind::KeptRemote,
            Resolution::Merge(_) => ResolutionKind::Merged,
            Resolution::Manual => ResolutionKind::Manual,
        }
    }
}

/// Compact tag describing which way a conflict was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionKind {
    /// Local version won.
    KeptLocal,
    /// Remote version won.
    KeptRemote,
    /// Field sets were merged.
    Merged,
    /// Left for manual resolution.
    Manual,
}

/// Policy for resolving overlapping field edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Last writer wins on the mutation timestamp; ties go to the remote
    /// side (server authoritative). The default.
    #[default]
    LastWriteWins,
    /// Overlapping edits are never auto-resolved; they are flagged and
    /// the local version stays until the user decides.
    Manual,
}

impl MergePolicy {
    /// Returns true if this policy resolves overlapping edits without
    /// user involvement.
    pub fn auto_resolves(&self) -> bool {
        matches!(self, MergePolicy::LastWriteWins)
    }
}

/// Diagnostic value retained when concurrent edits collide.
///
/// Conflict records preserve the losing edit for audit and manual
/// review. They are never required for correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Collection of the conflicted record.
    pub entity_type: EntityType,
    /// Identifier of the conflicted record.
    pub record_id: RecordId,
    /// Local version at resolution time.
    pub local: Record,
    /// Remote version at resolution time.
    pub remote: Record,
    /// How the conflict was resolved.
    pub resolution: ResolutionKind,
    /// When the resolution happened.
    pub resolved_at: Timestamp,
}

impl ConflictRecord {
    /// Creates a conflict record from the two versions and the chosen
    /// resolution.
    pub fn new(
        local: Record,
        remote: Record,
        resolution: ResolutionKind,
        resolved_at: Timestamp,
    ) -> Self {
        Self {
            entity_type: local.entity_type.clone(),
            record_id: local.id,
            local,
            remote,
            resolution,
            resolved_at,
        }
    }

    /// Stable key for persisting this conflict.
    ///
    /// Keyed by record, remote revision, and local mutation stamp so
    /// re-applying the same changeset after a crash does not duplicate
    /// the audit entry.
    pub fn audit_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(self.record_id.as_bytes());
        key.extend_from_slice(&self.remote.remote_rev.value().to_be_bytes());
        key.extend_from_slice(&self.local.modified_at.as_millis().to_be_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, Revision};
    use std::collections::BTreeMap;

    fn versions() -> (Record, Record) {
        let mut local = Record::new(EntityType::new("goal"), BTreeMap::new())
            .with_field("targetAmount", FieldValue::Integer(1000));
        let mut remote = local.clone();
        local.modified_at = Timestamp::from_millis(100);
        remote.modified_at = Timestamp::from_millis(200);
        remote.remote_rev = Revision::new(2);
        remote
            .fields
            .insert("targetAmount".into(), FieldValue::Integer(2000));
        (local, remote)
    }

    #[test]
    fn resolution_kinds() {
        let (_, remote) = versions();
        assert_eq!(Resolution::KeepLocal.kind(), ResolutionKind::KeptLocal);
        assert_eq!(Resolution::KeepRemote.kind(), ResolutionKind::KeptRemote);
        assert_eq!(Resolution::Merge(remote).kind(), ResolutionKind::Merged);
        assert_eq!(Resolution::Manual.kind(), ResolutionKind::Manual);
    }

    #[test]
    fn policy_auto_resolution() {
        assert!(MergePolicy::LastWriteWins.auto_resolves());
        assert!(!MergePolicy::Manual.auto_resolves());
        assert_eq!(MergePolicy::default(), MergePolicy::LastWriteWins);
    }

    #[test]
    fn audit_key_is_stable() {
        let (local, remote) = versions();
        let a = ConflictRecord::new(
            local.clone(),
            remote.clone(),
            ResolutionKind::KeptRemote,
            Timestamp::from_millis(300),
        );
        let b = ConflictRecord::new(
            local,
            remote,
            ResolutionKind::KeptRemote,
            Timestamp::from_millis(999),
        );
        // Resolution time does not enter the key.
        assert_eq!(a.audit_key(), b.audit_key());
    }
}
