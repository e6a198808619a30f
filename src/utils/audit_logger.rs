// Audit trail for privileged mutations, emitted on the `audit` tracing target
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    RoleChanged,
    StatusChanged,
    WalletCredited,
    WalletDebited,
    PurchaseCompleted,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub actor_id: Uuid,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct AuditLogger;

impl AuditLogger {
    pub fn record(
        action: AuditAction,
        actor_id: Uuid,
        resource_type: &str,
        resource_id: Option<Uuid>,
        details: Option<String>,
    ) {
        let audit_log = AuditLog {
            id: Uuid::new_v4(),
            action,
            actor_id,
            resource_type: resource_type.to_string(),
            resource_id,
            details,
            timestamp: Utc::now(),
        };

        let json_log = serde_json::to_string(&audit_log).unwrap_or_else(|e| {
            warn!("Failed to serialize audit log: {}", e);
            format!("{:?}", audit_log)
        });

        info!(target: "audit", "{}", json_log);
    }
}
