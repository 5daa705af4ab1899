pub mod activity;
pub mod client;
pub mod conversation;
pub mod message;
pub mod typing;

pub use activity::{ActivityDomain, ActivityEvent, NavTarget};
pub use client::{Client, ClientStatus};
pub use conversation::Conversation;
pub use message::{Message, SenderRole};
pub use typing::TypingSignal;
