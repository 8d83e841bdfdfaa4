//! Per-service inbox clients
//!
//! Each submodule implements [`crate::service::InboxService`] for one
//! third-party API. The poller never knows which service it is driving;
//! everything service-specific lives here.

pub mod fastmail;
pub mod marvin;
pub mod todoist;
pub mod ynab;

pub use fastmail::FastmailService;
pub use marvin::MarvinService;
pub use todoist::TodoistService;
pub use ynab::YnabService;
