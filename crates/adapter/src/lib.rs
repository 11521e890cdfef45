//! Client side of report discussions: store gateways, optimistic comment
//! threads, reaction aggregation and report-scoped notifications.

mod badge;
mod bus;
mod config;
mod controller;
pub mod drivers;
mod error;
mod reactions;
mod traits;

#[cfg(test)]
mod testing;

pub use badge::CommentCountBadge;
pub use bus::{EventBus, Subscription};
pub use config::{ClientSettings, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use controller::{CommentController, ControllerOptions};
pub use drivers::http::HttpStore;
pub use drivers::local::LocalStore;
pub use error::{ClientError, StoreError};
pub use reactions::ReactionAggregator;
pub use traits::{CommentStore, RatingStore, ReactionStore};
