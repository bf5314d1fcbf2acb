//! The analysis entry point: upload in, normalized inventory out.

use crate::config::Config;
use crate::error::UpstreamError;
use crate::export::CsvExporter;
use crate::llm::{ExtractionRequest, ImageInput, ProviderFactory, VisionProvider};
use crate::normalize::normalize;
use crate::types::{Analysis, Extraction};
use crate::upload::TempUpload;
use std::path::Path;
use std::sync::Arc;

/// Runs one upstream call per image and normalizes the answer.
///
/// Built once at startup and shared by every request; holds no mutable state.
pub struct Analyzer {
    config: Config,
    provider: Arc<dyn VisionProvider>,
    exporter: Option<CsvExporter>,
}

impl Analyzer {
    /// Create an analyzer around an explicit provider.
    pub fn new(config: Config, provider: Box<dyn VisionProvider>) -> Self {
        let exporter = config
            .export
            .enabled
            .then(|| CsvExporter::new(config.export_dir()));
        Self {
            config,
            provider: Arc::from(provider),
            exporter,
        }
    }

    /// Create an analyzer with the provider selected by `config.llm.style`.
    pub fn from_config(config: Config) -> Self {
        let provider = ProviderFactory::create(&config.llm);
        Self::new(config, provider)
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the provider in use.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Store `bytes` under `upload_dir`, analyze them, and delete the file.
    ///
    /// The temporary file is gone when this returns, whatever the outcome.
    pub async fn analyze_bytes(
        &self,
        upload_dir: &Path,
        bytes: &[u8],
        content_type: &str,
    ) -> crate::Result<Analysis> {
        let upload = TempUpload::persist(upload_dir, bytes, content_type).await?;
        let outcome = self.analyze(&upload).await;
        // Failure is logged by release(); it never changes the answer
        let _ = upload.release().await;
        Ok(outcome?)
    }

    /// Analyze one uploaded image.
    ///
    /// Only a failed upstream call (or an unreadable upload) is an error.
    /// Unusable model output comes back as [`Extraction::Unparsable`]; CSV
    /// export problems are logged and leave `csv_path` empty.
    pub async fn analyze(&self, upload: &TempUpload) -> Result<Analysis, UpstreamError> {
        let bytes = upload.read().await.map_err(|e| UpstreamError::Upload {
            message: e.to_string(),
        })?;
        let image = ImageInput::from_bytes(&bytes, upload.content_type());
        let request = ExtractionRequest::inventory(image, &self.config.llm);

        let reply = self.provider.extract(&request).await?;
        let extraction = normalize(&reply.response, &request.image);

        let csv_path = match (&self.exporter, &extraction) {
            (Some(exporter), Extraction::Inventory(result)) => {
                match exporter.export(result, chrono::Utc::now()) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        tracing::warn!(
                            dir = %exporter.dir().display(),
                            error = %e,
                            "CSV export failed"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        tracing::info!(
            provider = self.provider.name(),
            model = %reply.model,
            latency_ms = reply.latency_ms,
            tokens = reply.tokens_used,
            items = extraction.inventory().map(|r| r.len()),
            unparsable = extraction.is_unparsable(),
            "Analyzed image"
        );

        Ok(Analysis {
            extraction,
            csv_path,
            model: reply.model,
            latency_ms: reply.latency_ms,
        })
    }
}
