use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity supplied by the identity provider. Trusted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
}

impl TenantContext {
    pub fn new(user_id: Uuid, tenant_id: Uuid) -> Self {
        Self { user_id, tenant_id }
    }

    pub fn owns(&self, tenant_id: Uuid) -> bool {
        self.tenant_id == tenant_id
    }
}
