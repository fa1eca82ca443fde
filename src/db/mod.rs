//! Database layer
//!
//! MongoDB persistence for users, incidents and notifications, implementing
//! the contracts in [`crate::store`].

pub mod mongo;
pub mod schemas;
pub mod stores;

pub use mongo::{MongoClient, MongoCollection};
pub use stores::{MongoIdentityDirectory, MongoIncidentStore, MongoNotificationSink};
