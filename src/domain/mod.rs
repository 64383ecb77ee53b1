pub mod event;
pub mod post;
pub mod site;

pub use event::{ActionKind, Event, FetchDescriptor, PostKind};
pub use post::PostData;
pub use site::SiteDirectory;
