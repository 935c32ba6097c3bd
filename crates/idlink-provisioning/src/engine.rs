//! Outbound attribute mapping.
//!
//! [`MappingEngine::prepare_attributes`] resolves a resource mapping
//! against an identity and produces the external attribute set for a
//! connector write. Per-item resolution failures are logged and skipped;
//! only a missing account identifier fails the whole call.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use idlink_connector::{ConnectorGateway, ConnectorObject, Encryptor, PreparedAttributes};
use idlink_core::{Identity, IdentityKind, MappingSource, ResourceId};

use crate::cache::{VirAttrCache, VirAttrCacheKey};
use crate::error::{MappingError, MappingResult};
use crate::expression::ExpressionEvaluator;
use crate::mapping::{MappingItem, ResourceMapping};
use crate::password::{generate_from_policies, random_alphanumeric, PasswordPolicySpec};

/// Length of the fallback password used when policy generation fails.
const FALLBACK_PASSWORD_LENGTH: usize = 16;

/// Pending changes to virtual attribute values, applied during mapping
/// before any cache or remote lookup.
#[derive(Debug, Clone, Default)]
pub struct VirAttrDeltas {
    /// Attribute name to its full replacement value list.
    pub replace: HashMap<String, Vec<String>>,
    /// Attributes whose values are removed.
    pub clear: HashSet<String>,
}

impl VirAttrDeltas {
    /// Replacing and clearing the same attribute is contradictory.
    pub fn validate(&self) -> MappingResult<()> {
        for attribute in self.replace.keys() {
            if self.clear.contains(attribute) {
                return Err(MappingError::ConflictingDelta {
                    attribute: attribute.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Remote fetch memo for a single mapping call. A failure is remembered
/// so later virtual items for the same resource do not retry the call.
enum FetchOutcome {
    Object(Option<ConnectorObject>),
    Failed,
}

/// One outbound mapping call.
#[derive(Debug)]
pub struct MappingRequest<'a> {
    pub identity: &'a Identity,
    /// Clear-text password accompanying the change, if the caller has one.
    pub clear_password: Option<&'a str>,
    /// Whether the password should be propagated at all.
    pub change_password: bool,
    /// Whether to push the activation status as `__ENABLE__`.
    pub push_enable: bool,
    pub deltas: &'a VirAttrDeltas,
    /// Password policies in effect, for generation when the resource
    /// wants a password and none is available.
    pub policies: &'a [PasswordPolicySpec],
}

/// Resolves resource mappings into prepared attribute sets.
///
/// Stateless per call; the virtual attribute cache is the only shared
/// mutable state. All collaborators are injected.
pub struct MappingEngine {
    gateway: Arc<dyn ConnectorGateway>,
    cache: Arc<VirAttrCache>,
    encryptor: Arc<Encryptor>,
    evaluator: ExpressionEvaluator,
}

impl MappingEngine {
    pub fn new(
        gateway: Arc<dyn ConnectorGateway>,
        cache: Arc<VirAttrCache>,
        encryptor: Arc<Encryptor>,
    ) -> Self {
        Self {
            gateway,
            cache,
            encryptor,
            evaluator: ExpressionEvaluator::new(),
        }
    }

    /// Resolve every propagation item of `mapping` against the request's
    /// identity.
    ///
    /// Items that cannot be resolved are skipped with a warning; the
    /// call fails only when the mapping or deltas are structurally
    /// invalid, or when no account identifier value can be produced.
    pub async fn prepare_attributes(
        &self,
        req: &MappingRequest<'_>,
        mapping: &ResourceMapping,
    ) -> MappingResult<PreparedAttributes> {
        mapping.validate()?;
        req.deltas.validate()?;

        let mut prepared = PreparedAttributes::default();
        let mut fetched: HashMap<ResourceId, FetchOutcome> = HashMap::new();

        for item in mapping.propagation_items() {
            if item.password || item.source == MappingSource::Password {
                continue;
            }
            let values = match self.resolve_item(item, req, mapping, &mut fetched).await {
                Ok(values) => values,
                Err(e) => {
                    warn!(
                        resource = %mapping.name,
                        external_attr = %item.external_attr,
                        error = %e,
                        "skipping unresolvable mapping item"
                    );
                    continue;
                }
            };
            if item.account_identifier {
                prepared.account_id = values.first().cloned();
            } else {
                prepared.stage(item.external_attr.clone(), values);
            }
        }

        let wants_password = mapping
            .propagation_items()
            .any(|i| i.password || i.source == MappingSource::Password);
        if wants_password {
            if req.change_password {
                prepared.password = self.resolve_password(req, mapping);
            } else {
                debug!(resource = %mapping.name, "password change not requested, omitting password");
            }
        }

        let account_id =
            prepared
                .account_id
                .clone()
                .ok_or(MappingError::MissingAccountId {
                    resource_id: mapping.resource_id,
                })?;
        prepared.name = Some(self.evaluate_name(req.identity, mapping, &account_id));

        if req.push_enable {
            prepared.enable = req.identity.enabled;
        }

        Ok(prepared)
    }

    /// The account identifier value an identity maps to on a resource.
    pub fn account_id_value(
        &self,
        identity: &Identity,
        mapping: &ResourceMapping,
    ) -> MappingResult<String> {
        let missing = || MappingError::MissingAccountId {
            resource_id: mapping.resource_id,
        };
        let item = mapping.account_identifier_item().ok_or_else(missing)?;
        self.resolve_static(item, identity)
            .into_iter()
            .next()
            .ok_or_else(missing)
    }

    async fn resolve_item(
        &self,
        item: &MappingItem,
        req: &MappingRequest<'_>,
        mapping: &ResourceMapping,
        fetched: &mut HashMap<ResourceId, FetchOutcome>,
    ) -> MappingResult<Vec<String>> {
        if !item.source.is_virtual() {
            return Ok(self.resolve_static(item, req.identity));
        }

        let mut values = Vec::new();
        for holder in attributables(req.identity, item.source.scope()) {
            if holder.virtual_attr(&item.internal_attr).is_none() {
                continue;
            }
            let resolved = self
                .resolve_virtual(holder, item, req, mapping, fetched)
                .await?;
            values.extend(resolved);
        }
        Ok(values)
    }

    /// Resolve every non-virtual source synchronously.
    fn resolve_static(&self, item: &MappingItem, identity: &Identity) -> Vec<String> {
        let mut values = Vec::new();
        for holder in attributables(identity, item.source.scope()) {
            match item.source {
                MappingSource::Plain(_) => {
                    if let Some(attr) = holder.plain_attr(&item.internal_attr) {
                        values.extend(attr.effective_values());
                    }
                }
                MappingSource::Derived(_) => {
                    if let Some(attr) = holder.derived_attr(&item.internal_attr) {
                        let evaluated = self
                            .evaluator
                            .evaluate(&attr.expression, &holder.expression_context());
                        if !evaluated.is_empty() {
                            values.push(evaluated);
                        }
                    }
                }
                MappingSource::Username => {
                    if let Some(username) = &holder.username {
                        values.push(username.clone());
                    }
                }
                MappingSource::IdentityId(_) => {
                    values.push(holder.id.to_string());
                }
                // virtual resolution is async, password is handled by
                // prepare_attributes itself
                MappingSource::Virtual(_) | MappingSource::Password => {}
            }
        }
        values
    }

    /// Delta, then cache, then one memoized remote fetch per resource.
    async fn resolve_virtual(
        &self,
        holder: &Identity,
        item: &MappingItem,
        req: &MappingRequest<'_>,
        mapping: &ResourceMapping,
        fetched: &mut HashMap<ResourceId, FetchOutcome>,
    ) -> MappingResult<Vec<String>> {
        let key = VirAttrCacheKey::new(holder.kind, holder.id, item.internal_attr.clone());

        if let Some(values) = req.deltas.replace.get(&item.internal_attr) {
            self.cache.put(key, values.clone());
            return Ok(values.clone());
        }
        if req.deltas.clear.contains(&item.internal_attr) {
            self.cache.expire(&key);
            return Ok(Vec::new());
        }
        if let Some(values) = self.cache.get(&key) {
            debug!(attr = %item.internal_attr, "virtual attribute cache hit");
            return Ok((*values).clone());
        }

        if !fetched.contains_key(&mapping.resource_id) {
            let account_id = self.account_id_value(req.identity, mapping)?;
            let attributes_to_get: BTreeSet<String> = mapping
                .items
                .iter()
                .filter(|i| i.source.is_virtual())
                .map(|i| i.external_attr.clone())
                .collect();
            debug!(
                resource = %mapping.name,
                account_id = %account_id,
                "fetching virtual attribute values"
            );
            match self
                .gateway
                .fetch_object(mapping.resource_id, &account_id, &attributes_to_get)
                .await
            {
                Ok(obj) => {
                    fetched.insert(mapping.resource_id, FetchOutcome::Object(obj));
                }
                Err(e) => {
                    fetched.insert(mapping.resource_id, FetchOutcome::Failed);
                    return Err(e.into());
                }
            }
        }

        let values = match fetched.get(&mapping.resource_id) {
            Some(FetchOutcome::Object(obj)) => obj
                .as_ref()
                .map(|obj| obj.attribute_values(&item.external_attr))
                .unwrap_or_default(),
            Some(FetchOutcome::Failed) | None => {
                return Err(MappingError::inconsistent(format!(
                    "virtual attribute fetch already failed for resource {}",
                    mapping.resource_id
                )));
            }
        };
        self.cache.put(key, values.clone());
        Ok(values)
    }

    /// Clear password first, then a reversible stored password, then
    /// policy generation when the resource asks for it.
    fn resolve_password(
        &self,
        req: &MappingRequest<'_>,
        mapping: &ResourceMapping,
    ) -> Option<String> {
        if let Some(password) = req.clear_password {
            if !password.is_empty() {
                return Some(password.to_string());
            }
        }

        if let Some(stored) = &req.identity.password {
            if stored.algorithm.is_reversible() {
                match self.encryptor.decode(&stored.value, stored.algorithm) {
                    Ok(password) => return Some(password),
                    Err(e) => {
                        warn!(error = %e, "failed to decode stored password");
                    }
                }
            }
        }

        if mapping.random_password_if_missing {
            let password = match generate_from_policies(req.policies) {
                Ok(password) => password,
                Err(e) => {
                    warn!(error = %e, "password policies prevent generation, using random fallback");
                    random_alphanumeric(FALLBACK_PASSWORD_LENGTH)
                }
            };
            return Some(password);
        }

        None
    }

    /// Context for the account link: the identity's own fields and plain
    /// attributes plus every derived attribute, evaluated.
    fn name_context(&self, identity: &Identity) -> BTreeMap<String, String> {
        let mut context = identity.expression_context();
        let derived: Vec<(String, String)> = identity
            .derived_attrs
            .iter()
            .map(|attr| {
                (
                    attr.schema.clone(),
                    self.evaluator.evaluate(&attr.expression, &context),
                )
            })
            .collect();
        for (schema, value) in derived {
            if !value.is_empty() {
                context.insert(schema, value);
            }
        }
        context
    }

    fn evaluate_name(
        &self,
        identity: &Identity,
        mapping: &ResourceMapping,
        account_id: &str,
    ) -> String {
        if let Some(expr) = mapping
            .account_link
            .as_deref()
            .filter(|e| !e.trim().is_empty())
        {
            let evaluated = self
                .evaluator
                .evaluate(expr, &self.name_context(identity));
            if !evaluated.is_empty() {
                debug!(resource = %mapping.name, "__NAME__ from account link expression");
                return evaluated;
            }
            debug!(
                resource = %mapping.name,
                "account link evaluated blank, falling back to account identifier"
            );
        } else {
            debug!(resource = %mapping.name, "__NAME__ from account identifier");
        }
        account_id.to_string()
    }
}

impl std::fmt::Debug for MappingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingEngine").finish_non_exhaustive()
    }
}

/// The identities contributing values for a mapping source scope: the
/// identity itself when kinds match, otherwise its roles or memberships.
fn attributables(identity: &Identity, scope: IdentityKind) -> Vec<&Identity> {
    if identity.kind == scope {
        return vec![identity];
    }
    match scope {
        IdentityKind::Role => identity.roles.iter().collect(),
        IdentityKind::Membership => identity.memberships.iter().collect(),
        IdentityKind::User => Vec::new(),
    }
}
