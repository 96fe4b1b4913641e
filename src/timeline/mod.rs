//! Merged message timeline: a sorted, deduplicated store fed by backward
//! pagination and live events, and a read-only projection for rendering.

mod bridge;
mod pagination;
mod record;
mod store;
mod view;

pub use bridge::{EventEffect, LiveEventBridge};
pub use pagination::{Completion, FetchOutcome, PaginationController};
pub use record::{ChannelId, MessageId, MessageRecord, TimelineEntry};
pub use store::TimelineStore;
pub use view::{Step, TimelineView};
