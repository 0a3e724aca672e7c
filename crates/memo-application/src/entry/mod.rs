mod cache;
mod mutation;

pub use cache::{EntryCache, Generation};
pub use mutation::MutationPipeline;
