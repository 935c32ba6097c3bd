//! Gateway trait to external resources.

use async_trait::async_trait;
use idlink_core::ResourceId;
use std::collections::BTreeSet;

use crate::error::ConnectorResult;
use crate::types::ConnectorObject;

/// Read-side access to an external resource.
///
/// The mapping engine depends on this trait to resolve virtual attribute
/// values; implementations wrap the actual connector protocol.
#[async_trait]
pub trait ConnectorGateway: Send + Sync {
    /// Fetch the object identified by `account_id` on the given resource,
    /// requesting at least the named attributes.
    ///
    /// Returns `Ok(None)` when the object does not exist; transport
    /// failures surface as errors.
    async fn fetch_object(
        &self,
        resource_id: ResourceId,
        account_id: &str,
        attributes_to_get: &BTreeSet<String>,
    ) -> ConnectorResult<Option<ConnectorObject>>;
}
