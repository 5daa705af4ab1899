pub mod activity;
mod clock;
pub mod config;
pub mod constants;
pub mod datastore;
pub mod error;
pub mod events;
pub mod feed;
pub mod models;
pub mod poll;
pub mod presence;
pub mod resolver;
pub mod thread_store;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use datastore::{ChangeEvent, DataStore, MemoryStore, Topic};
pub use error::{CoreError, StoreError};
pub use events::{CoreEvent, EventSink};
