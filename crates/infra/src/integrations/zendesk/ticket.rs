use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::instrument;
use unibridge_core::{CallContext, ProviderAdapter, Unified};
use unibridge_domain::{
    ActionType, AdapterKey, CanonicalFields, CanonicalObject, CustomFieldValues, ObjectType, Page,
    Provider, ProviderCallError, ProviderPayload, ProviderResponse, PullSelector, PushTarget,
    Result, UnibridgeError, UnifiedTicket,
};

use super::types::{
    error_details, TicketEnvelope, TicketResponse, TicketsPage, ZendeskComment, ZendeskCustomField,
    ZendeskTicket,
};
use super::PAGE_SIZE;
use crate::http::HttpClient;
use crate::integrations::ApiEndpoint;

const KEY: AdapterKey = AdapterKey::new(Provider::Zendesk, ObjectType::Ticket);

const ROUND_TRIP_FIELDS: &[&str] = &[
    "name",
    "description",
    "status",
    "priority",
    "ticket_type",
    "due_date",
    "tags",
    "assigned_to",
];

/// Zendesk Support tickets
pub struct ZendeskTicketAdapter {
    endpoint: ApiEndpoint,
}

impl ZendeskTicketAdapter {
    /// Adapter calling Zendesk through `endpoint`.
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    async fn send_ticket(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        ticket: &Value,
    ) -> Result<TicketResponse> {
        let token = ctx.access_token()?;
        let url = self.endpoint.url(KEY, ctx, path)?;
        let request = self
            .endpoint
            .http()
            .request(method, url)
            .bearer_auth(token.as_str())
            .json(&TicketEnvelope { ticket });

        let response =
            self.endpoint.http().send(KEY, ActionType::Push, request, error_details).await?;
        HttpClient::read_json(KEY, ActionType::Push, response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = ctx.access_token()?;
        let url = self.endpoint.url(KEY, ctx, path)?;
        let request =
            self.endpoint.http().request(Method::GET, url).bearer_auth(token.as_str()).query(query);

        let response =
            self.endpoint.http().send(KEY, ActionType::Pull, request, error_details).await?;
        HttpClient::read_json(KEY, ActionType::Pull, response).await
    }
}

#[async_trait]
impl ProviderAdapter for ZendeskTicketAdapter {
    fn key(&self) -> AdapterKey {
        KEY
    }

    fn round_trip_fields(&self) -> &'static [&'static str] {
        ROUND_TRIP_FIELDS
    }

    fn canonical_attribute_for(&self, remote_field: &str) -> Option<&'static str> {
        match remote_field {
            "subject" => Some("name"),
            "description" | "comment" => Some("description"),
            "status" => Some("status"),
            "priority" => Some("priority"),
            "type" => Some("ticket_type"),
            "due_at" => Some("due_date"),
            "tags" => Some("tags"),
            "assignee_id" => Some("assigned_to"),
            "problem_id" => Some("parent_ticket"),
            _ => None,
        }
    }

    fn desunify(
        &self,
        canonical: &CanonicalObject,
        custom_fields: &CustomFieldValues,
    ) -> Result<ProviderPayload> {
        let ticket = canonical
            .fields
            .as_ticket()
            .ok_or_else(|| UnibridgeError::transform(KEY, "expected ticket fields"))?;

        let wire = ZendeskTicket {
            subject: ticket.name.clone(),
            comment: ticket
                .description
                .clone()
                .map(|body| ZendeskComment { body: Some(body), ..ZendeskComment::default() }),
            status: ticket.status.clone(),
            priority: ticket.priority.clone(),
            ticket_type: ticket.ticket_type.clone(),
            due_at: ticket.due_date,
            tags: ticket.tags.clone(),
            assignee_id: assignee_id(&ticket.assigned_to)?,
            custom_fields: custom_fields
                .iter()
                .map(|(id, value)| ZendeskCustomField { id: field_id(id), value: value.clone() })
                .collect(),
            ..ZendeskTicket::default()
        };

        let body = serde_json::to_value(&wire)
            .map_err(|e| UnibridgeError::transform(KEY, format!("ticket body: {e}")))?;
        Ok(ProviderPayload::create(body))
    }

    fn unify(&self, response: &ProviderResponse) -> Result<Unified> {
        let wire: ZendeskTicket = serde_json::from_value(response.as_value().clone())
            .map_err(|e| UnibridgeError::transform(KEY, format!("unreadable ticket: {e}")))?;

        let ticket = UnifiedTicket {
            name: wire.subject,
            status: wire.status,
            description: wire.description.or_else(|| wire.comment.and_then(|c| c.body)),
            due_date: wire.due_at,
            ticket_type: wire.ticket_type,
            parent_ticket: wire.problem_id.map(|id| id.to_string()),
            tags: wire.tags,
            completed_at: None,
            priority: wire.priority,
            assigned_to: wire.assignee_id.map(|id| id.to_string()).into_iter().collect(),
        };

        let custom_fields = wire
            .custom_fields
            .into_iter()
            .filter(|field| !field.value.is_null())
            .map(|field| (field_id_string(&field.id), field.value))
            .collect();

        let mut object = CanonicalObject::new(CanonicalFields::Ticket(ticket));
        object.remote_id = response.remote_id();
        Ok(Unified { object, custom_fields })
    }

    #[instrument(skip_all, fields(connection_id = %ctx.connection().id))]
    async fn push(&self, ctx: &CallContext, payload: &ProviderPayload) -> Result<String> {
        match &payload.target {
            PushTarget::Create => {
                let created = self
                    .send_ticket(ctx, Method::POST, "api/v2/tickets.json", &payload.body)
                    .await?;
                ProviderResponse::new(created.ticket).remote_id().ok_or_else(|| {
                    ProviderCallError::decode(KEY, ActionType::Push, "created ticket has no id")
                        .into()
                })
            }
            PushTarget::Update { remote_id } => {
                let mut body = payload.body.clone();
                // The description is the first comment; resending it would add another
                if let Some(fields) = body.as_object_mut() {
                    fields.remove("comment");
                }
                let path = format!("api/v2/tickets/{remote_id}.json");
                self.send_ticket(ctx, Method::PUT, &path, &body).await?;
                Ok(remote_id.clone())
            }
            PushTarget::CreateChild { .. } => Err(UnibridgeError::InvalidInput(
                "zendesk tickets cannot be created under a parent".into(),
            )),
        }
    }

    #[instrument(skip_all, fields(connection_id = %ctx.connection().id, ?selector))]
    async fn pull(
        &self,
        ctx: &CallContext,
        selector: &PullSelector,
        cursor: Option<&str>,
    ) -> Result<Page> {
        match selector {
            PullSelector::All => {
                let mut query = vec![("page[size]", PAGE_SIZE.to_string())];
                if let Some(cursor) = cursor {
                    query.push(("page[after]", cursor.to_string()));
                }
                let page: TicketsPage = self.get(ctx, "api/v2/tickets.json", &query).await?;
                Ok(Page {
                    items: page.tickets.into_iter().map(ProviderResponse::new).collect(),
                    next_cursor: page.meta.next_cursor(),
                })
            }
            PullSelector::Single(remote_id) => {
                let path = format!("api/v2/tickets/{remote_id}.json");
                let found: TicketResponse = self.get(ctx, &path, &[]).await?;
                Ok(Page::last(vec![ProviderResponse::new(found.ticket)]))
            }
            PullSelector::ChildrenOf(_) => {
                Err(ProviderCallError::unsupported_selector(
                    KEY,
                    "tickets are not pulled per parent",
                )
                .into())
            }
        }
    }
}

/// Zendesk takes a single numeric assignee.
fn assignee_id(assigned_to: &[String]) -> Result<Option<u64>> {
    match assigned_to {
        [] => Ok(None),
        [id] => id.trim().parse().map(Some).map_err(|_| {
            let message = format!("'{id}' is not a zendesk user id");
            UnibridgeError::transform_field(KEY, "assigned_to", message)
        }),
        _ => Err(UnibridgeError::transform_field(
            KEY,
            "assigned_to",
            "zendesk tickets have a single assignee",
        )),
    }
}

fn field_id(id: &str) -> Value {
    id.parse::<u64>().map_or_else(|_| Value::String(id.to_string()), Value::from)
}

fn field_id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
