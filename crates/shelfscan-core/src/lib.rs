//! Shelfscan Core - shelf photo to inventory list.
//!
//! Shelfscan sends a shelf photo to a vision language model and turns the
//! answer into a normalized inventory. The model does all the recognition;
//! this crate owns the parts around it:
//!
//! ```text
//! Upload → Temp file → Provider (one call) → Envelope → Normalize → Inventory / Diagnostic → CSV
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use shelfscan_core::{Analyzer, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let upload_dir = config.upload_dir();
//!     let analyzer = Analyzer::from_config(config);
//!
//!     let bytes = std::fs::read("shelf.jpg")?;
//!     let analysis = analyzer.analyze_bytes(&upload_dir, &bytes, "image/jpeg").await?;
//!     println!("{:?}", analysis.extraction);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod analyzer;
pub mod config;
pub mod error;
pub mod export;
pub mod llm;
pub mod normalize;
pub mod types;
pub mod upload;

// Re-exports for convenient access
pub use analyzer::Analyzer;
pub use config::{CallStyle, Config};
pub use error::{ConfigError, Result, ShelfscanError, UpstreamError};
pub use export::CsvExporter;
pub use llm::{ExtractionRequest, ImageInput, UpstreamReply, UpstreamResponse, VisionProvider};
pub use normalize::normalize;
pub use types::{
    Analysis, Extraction, InventoryItem, InventoryResult, UnparsableKind, UnparsableResult,
};
pub use upload::TempUpload;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
