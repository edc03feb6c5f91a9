//! Domain types and models

pub mod canonical;
pub mod connection;
pub mod mapping;
pub mod payload;
pub mod provider;
pub mod sync;

pub use canonical::{
    CanonicalFields, CanonicalObject, CanonicalRecord, ExtraFields, UnifiedComment,
    UnifiedContact, UnifiedTicket,
};
pub use connection::{Connection, SealedSecret};
pub use mapping::{FieldDataType, FieldMapping, MappingDirection};
pub use payload::{
    ActionType, CustomFieldValues, Page, ProviderPayload, ProviderResponse, PullSelector,
    PushTarget,
};
pub use provider::{AdapterKey, ObjectType, Provider, Vertical};
pub use sync::{SyncReport, SyncRequest, SyncState, SyncStatus};
