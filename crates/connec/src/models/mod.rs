//! Domain models for the import run

mod checkpoint;
mod entity;
mod page;
mod subscription;

pub use checkpoint::Checkpoint;
pub use entity::{EntityRecord, record_identifier};
pub use page::{FetchTarget, Page, Pagination, RemoteResponse};
pub use subscription::{Subscription, Subscriptions};
