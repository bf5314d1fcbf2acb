//! Upstream vision model integration.
//!
//! Provides a provider abstraction over the supported call styles (Chat
//! Completions with a JSON schema or a JSON object, and the Responses API)
//! and the envelope type every provider classifies its reply into.

pub mod envelope;
pub(crate) mod openai;
pub mod provider;
pub(crate) mod responses;

pub use envelope::{OutputBlock, UpstreamResponse};
pub use provider::{
    inventory_schema, ExtractionRequest, ImageInput, ProviderFactory, UpstreamReply,
    VisionProvider,
};
