mod link;

pub use link::{ClickContext, ClickRecord, CreatedLink, LinkRecord, LinkStats, NewLink};
