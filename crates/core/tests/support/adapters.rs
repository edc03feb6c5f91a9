//! Scripted provider adapters
//!
//! `MockTicketAdapter` serves numbered pages (`None`, `page-1`, `page-2`, ...)
//! and can be told to fail specific pages, delay pulls or cancel a token once
//! a page has been served. `MockCommentAdapter` serves comments per parent
//! ticket.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use unibridge_core::{CallContext, ProviderAdapter, Unified};
use unibridge_domain::{
    ActionType, AdapterKey, CanonicalFields, CanonicalObject, CustomFieldValues, ObjectType, Page,
    Provider, ProviderCallError, ProviderPayload, ProviderResponse, PullSelector, Result,
    UnibridgeError, UnifiedComment, UnifiedTicket,
};

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn put(body: &mut Map<String, Value>, field: &str, value: &Option<String>) {
    if let Some(value) = value {
        body.insert(field.to_string(), Value::String(value.clone()));
    }
}

pub struct MockTicketAdapter {
    key: AdapterKey,
    pages: Vec<Vec<Value>>,
    pull_failures: Mutex<HashMap<usize, VecDeque<UnibridgeError>>>,
    push_results: Mutex<VecDeque<Result<String>>>,
    pushes: Mutex<Vec<ProviderPayload>>,
    pull_calls: Mutex<Vec<Option<String>>>,
    pull_delay: Duration,
    cancel_after: Option<(usize, CancellationToken)>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for MockTicketAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTicketAdapter {
    pub fn new() -> Self {
        Self {
            key: AdapterKey::new(Provider::Zendesk, ObjectType::Ticket),
            pages: Vec::new(),
            pull_failures: Mutex::new(HashMap::new()),
            push_results: Mutex::new(VecDeque::new()),
            pushes: Mutex::new(Vec::new()),
            pull_calls: Mutex::new(Vec::new()),
            pull_delay: Duration::ZERO,
            cancel_after: None,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_pages(mut self, pages: Vec<Vec<Value>>) -> Self {
        self.pages = pages;
        self
    }

    /// Fail the pull of page `index` once with `error`.
    pub fn fail_pull(self, index: usize, error: UnibridgeError) -> Self {
        self.pull_failures.lock().unwrap().entry(index).or_default().push_back(error);
        self
    }

    pub fn with_push_result(self, result: Result<String>) -> Self {
        self.push_results.lock().unwrap().push_back(result);
        self
    }

    pub fn with_pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = delay;
        self
    }

    /// Cancel `token` right after page `index` has been served.
    pub fn cancel_after(mut self, index: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((index, token));
        self
    }

    pub fn pushes(&self) -> Vec<ProviderPayload> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn pull_calls(&self) -> Vec<Option<String>> {
        self.pull_calls.lock().unwrap().clone()
    }

    pub fn max_concurrent_pulls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn page_index(&self, cursor: Option<&str>) -> Result<usize> {
        match cursor {
            None => Ok(0),
            Some(c) => c.strip_prefix("page-").and_then(|n| n.parse().ok()).ok_or_else(|| {
                ProviderCallError::decode(self.key, ActionType::Pull, format!("bad cursor {c}"))
                    .into()
            }),
        }
    }

    fn serve(&self, selector: &PullSelector, cursor: Option<&str>) -> Result<Page> {
        if let PullSelector::Single(remote_id) = selector {
            let item = self
                .pages
                .iter()
                .flatten()
                .find(|v| {
                    ProviderResponse::new((*v).clone()).remote_id().as_deref() == Some(remote_id)
                })
                .cloned();
            return Ok(Page::last(item.into_iter().map(ProviderResponse::new).collect()));
        }
        if let PullSelector::ChildrenOf(_) = selector {
            return Err(
                ProviderCallError::unsupported_selector(self.key, "tickets have no parent").into()
            );
        }

        let index = self.page_index(cursor)?;
        let failure =
            self.pull_failures.lock().unwrap().get_mut(&index).and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_cursor = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));

        if let Some((cancel_index, token)) = &self.cancel_after {
            if *cancel_index == index {
                token.cancel();
            }
        }

        Ok(Page { items: items.into_iter().map(ProviderResponse::new).collect(), next_cursor })
    }
}

#[async_trait]
impl ProviderAdapter for MockTicketAdapter {
    fn key(&self) -> AdapterKey {
        self.key
    }

    fn round_trip_fields(&self) -> &'static [&'static str] {
        &["name", "status", "priority", "description", "tags"]
    }

    fn canonical_attribute_for(&self, remote_field: &str) -> Option<&'static str> {
        match remote_field {
            "subject" => Some("name"),
            "status" => Some("status"),
            "priority" => Some("priority"),
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
            .ok_or_else(|| UnibridgeError::transform(self.key, "expected a ticket"))?;

        let mut body = Map::new();
        put(&mut body, "subject", &ticket.name);
        put(&mut body, "status", &ticket.status);
        put(&mut body, "priority", &ticket.priority);
        put(&mut body, "description", &ticket.description);
        if !ticket.tags.is_empty() {
            body.insert("tags".into(), Value::from(ticket.tags.clone()));
        }
        body.insert(
            "custom".into(),
            Value::Object(custom_fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        );
        Ok(ProviderPayload::create(Value::Object(body)))
    }

    fn unify(&self, response: &ProviderResponse) -> Result<Unified> {
        let value = response.as_value();
        if !value.is_object() {
            return Err(UnibridgeError::transform(self.key, "ticket is not an object"));
        }

        let ticket = UnifiedTicket {
            name: str_field(value, "subject"),
            status: str_field(value, "status"),
            priority: str_field(value, "priority"),
            description: str_field(value, "description"),
            tags: value
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            ..UnifiedTicket::default()
        };
        let custom_fields = value
            .get("custom")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let mut object = CanonicalObject::new(CanonicalFields::Ticket(ticket));
        object.remote_id = response.remote_id();
        Ok(Unified { object, custom_fields })
    }

    async fn push(&self, ctx: &CallContext, payload: &ProviderPayload) -> Result<String> {
        let _token = ctx.access_token()?;
        let count = {
            let mut pushes = self.pushes.lock().unwrap();
            pushes.push(payload.clone());
            pushes.len()
        };
        let scripted = self.push_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("remote-{count}")))
    }

    async fn pull(
        &self,
        ctx: &CallContext,
        selector: &PullSelector,
        cursor: Option<&str>,
    ) -> Result<Page> {
        let _token = ctx.access_token()?;
        self.pull_calls.lock().unwrap().push(cursor.map(str::to_string));

        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(current, Ordering::SeqCst);
        if !self.pull_delay.is_zero() {
            tokio::time::sleep(self.pull_delay).await;
        }
        let result = self.serve(selector, cursor);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub struct MockCommentAdapter {
    by_parent: HashMap<String, Vec<Value>>,
    pushes: Mutex<Vec<ProviderPayload>>,
}

impl MockCommentAdapter {
    pub fn new() -> Self {
        Self { by_parent: HashMap::new(), pushes: Mutex::new(Vec::new()) }
    }

    pub fn with_comments(mut self, parent_remote_id: &str, comments: Vec<Value>) -> Self {
        self.by_parent.insert(parent_remote_id.to_string(), comments);
        self
    }

    pub fn pushes(&self) -> Vec<ProviderPayload> {
        self.pushes.lock().unwrap().clone()
    }
}

impl Default for MockCommentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockCommentAdapter {
    fn key(&self) -> AdapterKey {
        AdapterKey::new(Provider::Zendesk, ObjectType::Comment)
    }

    fn round_trip_fields(&self) -> &'static [&'static str] {
        &["body", "is_private"]
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        Some(ObjectType::Ticket)
    }

    fn desunify(
        &self,
        canonical: &CanonicalObject,
        _custom_fields: &CustomFieldValues,
    ) -> Result<ProviderPayload> {
        let comment = canonical
            .fields
            .as_comment()
            .ok_or_else(|| UnibridgeError::transform(self.key(), "expected a comment"))?;
        let mut body = Map::new();
        put(&mut body, "body", &comment.body);
        body.insert("public".into(), Value::Bool(!comment.is_private.unwrap_or(false)));
        Ok(ProviderPayload::create(Value::Object(body)))
    }

    fn unify(&self, response: &ProviderResponse) -> Result<Unified> {
        let value = response.as_value();
        let comment = UnifiedComment {
            body: str_field(value, "body"),
            is_private: value.get("public").and_then(Value::as_bool).map(|public| !public),
            ..UnifiedComment::default()
        };
        let mut object = CanonicalObject::new(CanonicalFields::Comment(comment));
        object.remote_id = response.remote_id();
        Ok(Unified { object, custom_fields: CustomFieldValues::new() })
    }

    async fn push(&self, _ctx: &CallContext, payload: &ProviderPayload) -> Result<String> {
        let mut pushes = self.pushes.lock().unwrap();
        pushes.push(payload.clone());
        Ok(format!("c-{}", pushes.len()))
    }

    async fn pull(
        &self,
        _ctx: &CallContext,
        selector: &PullSelector,
        _cursor: Option<&str>,
    ) -> Result<Page> {
        match selector {
            PullSelector::ChildrenOf(parent) => Ok(Page::last(
                self.by_parent
                    .get(parent)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(ProviderResponse::new)
                    .collect(),
            )),
            _ => Err(ProviderCallError::unsupported_selector(self.key(), "comments need a ticket")
                .into()),
        }
    }
}
