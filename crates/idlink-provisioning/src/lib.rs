//! Attribute mapping and provisioning core for idlink.
//!
//! The outbound path resolves a [`mapping::ResourceMapping`] against an
//! identity through the [`engine::MappingEngine`], producing the external
//! attribute set for a connector write. The inbound path turns connector
//! objects back into transfer objects via
//! [`reconcile::ReconciliationBuilder`]. Virtual attribute values are
//! cached in [`cache::VirAttrCache`]; generated passwords obey the merged
//! policies in [`password`].

pub mod cache;
pub mod engine;
pub mod error;
pub mod expression;
pub mod mapping;
pub mod password;
pub mod reconcile;

pub use cache::{VirAttrCache, VirAttrCacheKey, VirAttrCacheStats};
pub use engine::{MappingEngine, MappingRequest, VirAttrDeltas};
pub use error::{MappingError, MappingResult};
pub use expression::{EvaluatorConfig, ExpressionEvaluator};
pub use mapping::{MappingItem, MappingPurpose, ResourceMapping};
pub use password::{
    generate_from_policies, generate_password, merge_policies, random_alphanumeric,
    validate_policy, PasswordPolicySpec, PolicyConflict,
};
pub use reconcile::ReconciliationBuilder;
