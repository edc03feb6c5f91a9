//! Port interfaces implemented by provider integrations

use async_trait::async_trait;
use unibridge_domain::{
    AdapterKey, CanonicalObject, CustomFieldValues, ObjectType, Page, ProviderPayload,
    ProviderResponse, PullSelector, Result, SealedSecret,
};
use zeroize::Zeroizing;

use super::context::CallContext;

/// Output of [`ProviderAdapter::unify`]
#[derive(Debug, Clone, PartialEq)]
pub struct Unified {
    /// Canonical object with fixed fields and `remote_id` filled in.
    /// `field_mappings` is left empty for the engine to populate.
    pub object: CanonicalObject,
    /// Raw custom field values keyed by provider field id
    pub custom_fields: CustomFieldValues,
}

/// Capability contract for one `(provider, object type)` pair
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Registry key this adapter serves
    fn key(&self) -> AdapterKey;

    /// Fixed attributes that survive `unify(desunify(c))` unchanged
    fn round_trip_fields(&self) -> &'static [&'static str];

    /// Object type whose remote id must be known before this one can be
    /// pushed or pulled (e.g. the ticket of a comment)
    fn parent_object_type(&self) -> Option<ObjectType> {
        None
    }

    fn requires_parent(&self) -> bool {
        self.parent_object_type().is_some()
    }

    /// Canonical attribute written to a provider-native field, used to report
    /// which canonical field a provider rejected
    fn canonical_attribute_for(&self, _remote_field: &str) -> Option<&'static str> {
        None
    }

    /// Convert a canonical object into the provider body.
    ///
    /// `custom_fields` holds the already-translated custom field values keyed
    /// by provider field id. The returned payload targets `Create`; callers
    /// retarget it for updates and child objects.
    fn desunify(
        &self,
        canonical: &CanonicalObject,
        custom_fields: &CustomFieldValues,
    ) -> Result<ProviderPayload>;

    /// Convert one provider object back into canonical form. Unknown provider
    /// fields are ignored.
    fn unify(&self, response: &ProviderResponse) -> Result<Unified>;

    /// Perform the write call and return the remote id.
    async fn push(&self, ctx: &CallContext, payload: &ProviderPayload) -> Result<String>;

    /// Fetch one page. `cursor` is `None` for the first page.
    async fn pull(
        &self,
        ctx: &CallContext,
        selector: &PullSelector,
        cursor: Option<&str>,
    ) -> Result<Page>;
}

/// Decrypt boundary for connection secrets
pub trait SecretDecryptor: Send + Sync {
    /// Plaintext is wiped when the returned value is dropped.
    fn decrypt(&self, secret: &SealedSecret) -> Result<Zeroizing<String>>;
}
