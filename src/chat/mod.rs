pub mod context;
pub mod pipeline;
pub mod prompt;

pub use context::{Category, CollectionSnapshot, ContextBuilder};
pub use pipeline::{ChatPipeline, SharedChatPipeline};
