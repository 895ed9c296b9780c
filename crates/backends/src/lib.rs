mod clock;
mod media;
mod resolver;

pub use clock::ClockBackend;
pub use media::{BackendEvent, MediaBackend, NullBackend};
pub use resolver::{MetadataError, MetadataResolver, ResolverChain};
