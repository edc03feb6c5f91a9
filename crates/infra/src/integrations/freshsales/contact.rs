use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::instrument;
use unibridge_core::{CallContext, ProviderAdapter, Unified};
use unibridge_domain::{
    ActionType, AdapterKey, CanonicalFields, CanonicalObject, CustomFieldValues, ObjectType, Page,
    Provider, ProviderCallError, ProviderPayload, ProviderResponse, PullSelector, PushTarget,
    Result, UnibridgeError, UnifiedContact,
};
use zeroize::Zeroizing;

use super::types::{
    error_details, ContactEnvelope, ContactResponse, ContactsPage, FreshsalesContact,
};
use crate::http::HttpClient;
use crate::integrations::ApiEndpoint;

const KEY: AdapterKey = AdapterKey::new(Provider::Freshsales, ObjectType::Contact);

/// Connection metadata key naming the contact view listed by a full pull
pub const CONTACT_VIEW_METADATA_KEY: &str = "contact_view_id";

/// Freshsales CRM contacts
pub struct FreshsalesContactAdapter {
    endpoint: ApiEndpoint,
}

impl FreshsalesContactAdapter {
    /// Adapter calling Freshsales through `endpoint`.
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    fn authorized(&self, ctx: &CallContext, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = ctx.access_token()?;
        let header = Zeroizing::new(format!("Token token={}", token.as_str()));
        let mut value = HeaderValue::from_str(&header)
            .map_err(|_| {
                UnibridgeError::Security("access token is not a valid header value".into())
            })?;
        value.set_sensitive(true);

        let url = self.endpoint.url(KEY, ctx, path)?;
        Ok(self.endpoint.http().request(method, url).header(AUTHORIZATION, value))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: ActionType,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.endpoint.http().send(KEY, action, request, error_details).await?;
        HttpClient::read_json(KEY, action, response).await
    }

    async fn pull_view(&self, ctx: &CallContext, cursor: Option<&str>) -> Result<Page> {
        let view_id = ctx.connection().metadata_value(CONTACT_VIEW_METADATA_KEY).ok_or_else(|| {
            ProviderCallError::unsupported_selector(
                KEY,
                format!(
                    "listing contacts needs the '{CONTACT_VIEW_METADATA_KEY}' connection setting"
                ),
            )
        })?;

        let page_number = match cursor {
            None => 1,
            Some(cursor) => cursor.parse::<u32>().map_err(|_| {
                let message = format!("bad page cursor '{cursor}'");
                ProviderCallError::decode(KEY, ActionType::Pull, message)
            })?,
        };

        let request = self
            .authorized(ctx, Method::GET, &format!("api/contacts/view/{view_id}"))?
            .query(&[("page", page_number)]);
        let page: ContactsPage = self.call(ActionType::Pull, request).await?;

        Ok(Page {
            items: page.contacts.into_iter().map(ProviderResponse::new).collect(),
            next_cursor: (page_number < page.meta.total_pages)
                .then(|| (page_number + 1).to_string()),
        })
    }
}

#[async_trait]
impl ProviderAdapter for FreshsalesContactAdapter {
    fn key(&self) -> AdapterKey {
        KEY
    }

    fn round_trip_fields(&self) -> &'static [&'static str] {
        &["first_name", "last_name", "email_address", "phone_number", "job_title"]
    }

    fn canonical_attribute_for(&self, remote_field: &str) -> Option<&'static str> {
        match remote_field {
            "first_name" => Some("first_name"),
            "last_name" => Some("last_name"),
            "email" | "emails" => Some("email_address"),
            "mobile_number" | "work_number" => Some("phone_number"),
            "job_title" => Some("job_title"),
            _ => None,
        }
    }

    fn desunify(
        &self,
        canonical: &CanonicalObject,
        custom_fields: &CustomFieldValues,
    ) -> Result<ProviderPayload> {
        let contact = canonical
            .fields
            .as_contact()
            .ok_or_else(|| UnibridgeError::transform(KEY, "expected contact fields"))?;

        if contact.first_name.is_none()
            && contact.last_name.is_none()
            && contact.email_address.is_none()
        {
            return Err(UnibridgeError::transform(
                KEY,
                "a contact needs a name or an email address",
            ));
        }

        let wire = FreshsalesContact {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email_address.clone(),
            mobile_number: contact.phone_number.clone(),
            job_title: contact.job_title.clone(),
            custom_field: custom_fields
                .iter()
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect(),
            ..FreshsalesContact::default()
        };

        let body = serde_json::to_value(&wire)
            .map_err(|e| UnibridgeError::transform(KEY, format!("contact body: {e}")))?;
        Ok(ProviderPayload::create(body))
    }

    fn unify(&self, response: &ProviderResponse) -> Result<Unified> {
        let wire: FreshsalesContact = serde_json::from_value(response.as_value().clone())
            .map_err(|e| UnibridgeError::transform(KEY, format!("unreadable contact: {e}")))?;

        let contact = UnifiedContact {
            first_name: wire.first_name,
            last_name: wire.last_name,
            email_address: wire.email,
            phone_number: wire.mobile_number.or(wire.work_number),
            job_title: wire.job_title,
        };

        let custom_fields = wire
            .custom_field
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();

        let mut object = CanonicalObject::new(CanonicalFields::Contact(contact));
        object.remote_id = response.remote_id();
        Ok(Unified { object, custom_fields })
    }

    #[instrument(skip_all, fields(connection_id = %ctx.connection().id))]
    async fn push(&self, ctx: &CallContext, payload: &ProviderPayload) -> Result<String> {
        let (method, path) = match &payload.target {
            PushTarget::Create => (Method::POST, "api/contacts".to_string()),
            PushTarget::Update { remote_id } => (Method::PUT, format!("api/contacts/{remote_id}")),
            PushTarget::CreateChild { .. } => {
                return Err(UnibridgeError::InvalidInput(
                    "freshsales contacts cannot be created under a parent".into(),
                ))
            }
        };

        let request = self
            .authorized(ctx, method, &path)?
            .json(&ContactEnvelope { contact: &payload.body });
        let saved: ContactResponse = self.call(ActionType::Push, request).await?;

        ProviderResponse::new(saved.contact).remote_id().ok_or_else(|| {
            ProviderCallError::decode(KEY, ActionType::Push, "saved contact has no id").into()
        })
    }

    #[instrument(skip_all, fields(connection_id = %ctx.connection().id, ?selector))]
    async fn pull(
        &self,
        ctx: &CallContext,
        selector: &PullSelector,
        cursor: Option<&str>,
    ) -> Result<Page> {
        match selector {
            PullSelector::All => self.pull_view(ctx, cursor).await,
            PullSelector::Single(remote_id) => {
                let path = format!("api/contacts/{remote_id}");
                let request = self.authorized(ctx, Method::GET, &path)?;
                let found: ContactResponse = self.call(ActionType::Pull, request).await?;
                Ok(Page::last(vec![ProviderResponse::new(found.contact)]))
            }
            PullSelector::ChildrenOf(_) => Err(ProviderCallError::unsupported_selector(
                KEY,
                "freshsales contacts are not pulled per parent",
            )
            .into()),
        }
    }
}
