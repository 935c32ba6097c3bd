//! Inbound reconciliation: connector objects into transfer objects.

use tracing::{debug, warn};

use idlink_connector::ConnectorObject;
use idlink_core::{IdentityKind, IdentityTransferObject, MappingSource};

use crate::expression::ExpressionEvaluator;
use crate::mapping::ResourceMapping;
use crate::password::{generate_from_policies, random_alphanumeric, PasswordPolicySpec};

/// Length of the fallback password assigned to pulled identities when
/// policy generation fails.
const FALLBACK_PASSWORD_LENGTH: usize = 16;

/// Builds transfer objects from connector objects during pull.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationBuilder {
    evaluator: ExpressionEvaluator,
}

impl ReconciliationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a connector object through the pull items of a mapping,
    /// then fill gaps from an optional template.
    ///
    /// Absent external attributes yield empty value lists. Items scoped
    /// to roles or memberships are skipped: a pulled account only
    /// describes the user itself.
    #[must_use]
    pub fn build_identity(
        &self,
        obj: &ConnectorObject,
        mapping: &ResourceMapping,
        template: Option<&IdentityTransferObject>,
    ) -> IdentityTransferObject {
        let mut ito = IdentityTransferObject::new(IdentityKind::User);

        for item in mapping.pull_items() {
            if item.source.scope() != IdentityKind::User {
                debug!(
                    external_attr = %item.external_attr,
                    scope = %item.source.scope(),
                    "skipping non-user item during pull"
                );
                continue;
            }
            let values = obj.attribute_values(&item.external_attr);
            match item.source {
                MappingSource::Username => {
                    ito.username = values.into_iter().next();
                }
                MappingSource::Password => {
                    ito.password = values.into_iter().next();
                }
                MappingSource::IdentityId(_) => {
                    debug!(
                        external_attr = %item.external_attr,
                        "internal id is not pullable, skipping"
                    );
                }
                MappingSource::Plain(_) => {
                    ito.plain_attrs.insert(item.internal_attr.clone(), values);
                }
                MappingSource::Derived(_) => {
                    ito.derived_attrs.insert(item.internal_attr.clone(), values);
                }
                MappingSource::Virtual(_) => {
                    ito.virtual_attrs.insert(item.internal_attr.clone(), values);
                }
            }
        }

        if let Some(template) = template {
            self.apply_template(&mut ito, template);
        }

        ito
    }

    /// Turn a freshly built transfer object into an update against an
    /// existing one.
    ///
    /// Membership ids are carried over by role so an unchanged
    /// relationship is not deleted and recreated. A blank or unchanged
    /// password is cleared: there is nothing to update.
    #[must_use]
    pub fn build_update(
        &self,
        existing: &IdentityTransferObject,
        incoming: &IdentityTransferObject,
    ) -> IdentityTransferObject {
        let mut updated = incoming.clone();

        for membership in &mut updated.memberships {
            if membership.membership_id.is_none() {
                if let Some(prev) = existing
                    .memberships
                    .iter()
                    .find(|p| p.role_id == membership.role_id)
                {
                    membership.membership_id = prev.membership_id;
                }
            }
        }

        let blank = updated.password.as_deref().map_or(true, str::is_empty);
        if blank || updated.password == existing.password {
            updated.password = None;
        }

        updated
    }

    /// Guarantee the transfer object carries a password, generating one
    /// from the given policies when it is blank.
    pub fn ensure_password(
        &self,
        ito: &mut IdentityTransferObject,
        policies: &[PasswordPolicySpec],
    ) {
        let blank = ito.password.as_deref().map_or(true, str::is_empty);
        if !blank {
            return;
        }
        let password = match generate_from_policies(policies) {
            Ok(password) => password,
            Err(e) => {
                warn!(error = %e, "password policies prevent generation, using random fallback");
                random_alphanumeric(FALLBACK_PASSWORD_LENGTH)
            }
        };
        ito.password = Some(password);
    }

    /// Template semantics: username and password expressions overwrite
    /// only when they evaluate non-blank; attribute maps fill in only
    /// what is absent.
    fn apply_template(&self, ito: &mut IdentityTransferObject, template: &IdentityTransferObject) {
        let context = ito.to_expression_context();

        if let Some(expr) = &template.username {
            let evaluated = self.evaluator.evaluate(expr, &context);
            if !evaluated.is_empty() {
                ito.username = Some(evaluated);
            }
        }
        if let Some(expr) = &template.password {
            let evaluated = self.evaluator.evaluate(expr, &context);
            if !evaluated.is_empty() {
                ito.password = Some(evaluated);
            }
        }

        for (schema, expressions) in &template.plain_attrs {
            if ito.has_plain_attr(schema) {
                continue;
            }
            let values: Vec<String> = expressions
                .iter()
                .map(|expr| self.evaluator.evaluate(expr, &context))
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                ito.plain_attrs.insert(schema.clone(), values);
            }
        }

        for (schema, expressions) in &template.virtual_attrs {
            if ito
                .virtual_attrs
                .get(schema)
                .is_some_and(|values| values.iter().any(|v| !v.is_empty()))
            {
                continue;
            }
            let values: Vec<String> = expressions
                .iter()
                .map(|expr| self.evaluator.evaluate(expr, &context))
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                ito.virtual_attrs.insert(schema.clone(), values);
            }
        }

        // derived attributes carry expressions by definition, copy verbatim
        for (schema, values) in &template.derived_attrs {
            ito.derived_attrs
                .entry(schema.clone())
                .or_insert_with(|| values.clone());
        }

        for membership in &template.memberships {
            if !ito
                .memberships
                .iter()
                .any(|m| m.role_id == membership.role_id)
            {
                ito.memberships.push(membership.clone());
            }
        }
    }
}
