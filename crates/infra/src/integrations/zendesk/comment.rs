//! Zendesk ticket comments
//!
//! Zendesk has no endpoint that creates a comment directly: a comment is
//! added by updating its ticket with a `comment` object. The new comment's id
//! comes back in the audit of that update.

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};
use unibridge_core::{CallContext, ProviderAdapter, Unified};
use unibridge_domain::{
    ActionType, AdapterKey, CanonicalFields, CanonicalObject, CustomFieldValues, ObjectType, Page,
    Provider, ProviderCallError, ProviderPayload, ProviderResponse, PullSelector, PushTarget,
    Result, UnibridgeError, UnifiedComment,
};

use super::types::{error_details, CommentsPage, TicketAuditResponse, ZendeskComment};
use super::PAGE_SIZE;
use crate::http::HttpClient;
use crate::integrations::ApiEndpoint;

const KEY: AdapterKey = AdapterKey::new(Provider::Zendesk, ObjectType::Comment);

/// Zendesk ticket comments, pushed and pulled through their parent ticket
pub struct ZendeskCommentAdapter {
    endpoint: ApiEndpoint,
}

impl ZendeskCommentAdapter {
    /// Adapter calling Zendesk through `endpoint`.
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    async fn add_to_ticket(
        &self,
        ctx: &CallContext,
        ticket_remote_id: &str,
        comment: &serde_json::Value,
    ) -> Result<String> {
        let token = ctx.access_token()?;
        let url = self.endpoint.url(KEY, ctx, &format!("api/v2/tickets/{ticket_remote_id}.json"))?;
        let request = self
            .endpoint
            .http()
            .request(Method::PUT, url)
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({ "ticket": { "comment": comment } }));

        let response =
            self.endpoint.http().send(KEY, ActionType::Push, request, error_details).await?;
        let updated: TicketAuditResponse =
            HttpClient::read_json(KEY, ActionType::Push, response).await?;

        updated
            .audit
            .into_iter()
            .flat_map(|audit| audit.events)
            .find(|event| event.event_type == "Comment")
            .map(|event| match event.id {
                serde_json::Value::String(id) => id,
                other => other.to_string(),
            })
            .ok_or_else(|| {
                let message = "ticket audit has no comment event";
                ProviderCallError::decode(KEY, ActionType::Push, message).into()
            })
    }
}

#[async_trait]
impl ProviderAdapter for ZendeskCommentAdapter {
    fn key(&self) -> AdapterKey {
        KEY
    }

    fn round_trip_fields(&self) -> &'static [&'static str] {
        &["body", "html_body", "is_private"]
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        Some(ObjectType::Ticket)
    }

    fn canonical_attribute_for(&self, remote_field: &str) -> Option<&'static str> {
        match remote_field {
            "body" => Some("body"),
            "html_body" => Some("html_body"),
            "public" => Some("is_private"),
            "author_id" => Some("user_id"),
            _ => None,
        }
    }

    fn desunify(
        &self,
        canonical: &CanonicalObject,
        custom_fields: &CustomFieldValues,
    ) -> Result<ProviderPayload> {
        let comment = canonical
            .fields
            .as_comment()
            .ok_or_else(|| UnibridgeError::transform(KEY, "expected comment fields"))?;

        if comment.body.is_none() && comment.html_body.is_none() {
            return Err(UnibridgeError::transform_field(KEY, "body", "a comment needs a body"));
        }
        if !custom_fields.is_empty() {
            debug!(dropped = custom_fields.len(), "zendesk comments carry no custom fields");
        }

        let wire = ZendeskComment {
            body: comment.body.clone(),
            html_body: comment.html_body.clone(),
            public: comment.is_private.map(|private| !private),
            ..ZendeskComment::default()
        };
        let body = serde_json::to_value(&wire)
            .map_err(|e| UnibridgeError::transform(KEY, format!("comment body: {e}")))?;
        Ok(ProviderPayload::create(body))
    }

    fn unify(&self, response: &ProviderResponse) -> Result<Unified> {
        let wire: ZendeskComment = serde_json::from_value(response.as_value().clone())
            .map_err(|e| UnibridgeError::transform(KEY, format!("unreadable comment: {e}")))?;

        let comment = UnifiedComment {
            body: wire.body,
            html_body: wire.html_body,
            is_private: wire.public.map(|public| !public),
            creator_type: None,
            ticket_id: None,
            contact_id: None,
            user_id: wire.author_id.map(|id| id.to_string()),
        };

        let mut object = CanonicalObject::new(CanonicalFields::Comment(comment));
        object.remote_id = response.remote_id();
        Ok(Unified { object, custom_fields: CustomFieldValues::new() })
    }

    #[instrument(skip_all, fields(connection_id = %ctx.connection().id))]
    async fn push(&self, ctx: &CallContext, payload: &ProviderPayload) -> Result<String> {
        match &payload.target {
            PushTarget::CreateChild { parent_remote_id } => {
                self.add_to_ticket(ctx, parent_remote_id, &payload.body).await
            }
            PushTarget::Create => Err(UnibridgeError::InvalidInput(
                "zendesk comments must be created on a ticket".into(),
            )),
            PushTarget::Update { .. } => {
                Err(UnibridgeError::InvalidInput("zendesk comments cannot be edited".into()))
            }
        }
    }

    #[instrument(skip_all, fields(connection_id = %ctx.connection().id, ?selector))]
    async fn pull(
        &self,
        ctx: &CallContext,
        selector: &PullSelector,
        cursor: Option<&str>,
    ) -> Result<Page> {
        let PullSelector::ChildrenOf(ticket_remote_id) = selector else {
            return Err(ProviderCallError::unsupported_selector(
                KEY,
                "zendesk comments are only listed per ticket",
            )
            .into());
        };

        let mut query = vec![("page[size]", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("page[after]", cursor.to_string()));
        }

        let token = ctx.access_token()?;
        let path = format!("api/v2/tickets/{ticket_remote_id}/comments.json");
        let url = self.endpoint.url(KEY, ctx, &path)?;
        let request = self
            .endpoint
            .http()
            .request(Method::GET, url)
            .bearer_auth(token.as_str())
            .query(&query);

        let response =
            self.endpoint.http().send(KEY, ActionType::Pull, request, error_details).await?;
        let page: CommentsPage = HttpClient::read_json(KEY, ActionType::Pull, response).await?;

        Ok(Page {
            items: page.comments.into_iter().map(ProviderResponse::new).collect(),
            next_cursor: page.meta.next_cursor(),
        })
    }
}
