//! Zendesk Support integration
//!
//! Bearer-token access to the v2 REST API. The API root is the account's
//! `https://{subdomain}.zendesk.com`, taken from the connection's `base_url`
//! metadata or the configured default.
//!
//! Lists use cursor pagination: `page[size]` and `page[after]` go out,
//! `meta.has_more` and `meta.after_cursor` come back.

pub mod comment;
pub mod ticket;
pub mod types;

pub use comment::ZendeskCommentAdapter;
pub use ticket::ZendeskTicketAdapter;

const PAGE_SIZE: u32 = 100;
