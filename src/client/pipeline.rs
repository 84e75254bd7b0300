//! # Scan Pipeline
//!
//! Orchestrates one scan from captured images to a persisted table.
//!
//! ## Request Workflow
//!
//! 1. **Build**: encode images and title as a [`ScanRequest`]
//! 2. **Seal**: encrypt the request with the [`Codec`]
//! 3. **Send**: one POST through the [`TransportClient`]
//! 4. **Unwrap**: extract and open the sealed `table` field
//! 5. **Resolve**: classify the decrypted JSON into records
//! 6. **Flatten**: compute columns and render rows
//! 7. **Persist**: write the table atomically to the [`ArtifactStore`]
//!
//! Stages run strictly in sequence. Any failure ends the run with a typed
//! [`PipelineError`]; nothing is retried.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = PipelineConfig::from_file("config/scansheet.toml")?;
//! let pipeline = Arc::new(ScanPipeline::from_config(&config)?);
//!
//! // Runs on a background task; the caller awaits a single result.
//! let artifact = pipeline.spawn(images).await?;
//! println!("Saved {}", artifact.path.display());
//! ```

use log::{error, info};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::envelope::unwrap_table;
use super::transport::TransportClient;
use crate::common::config::PipelineConfig;
use crate::common::error::{PipelineError, TransportError};
use crate::common::messages::ScanRequest;
use crate::processing::artifact::{ArtifactStore, PersistedArtifact};
use crate::processing::codec::Codec;
use crate::processing::flatten::flatten;
use crate::processing::shape::resolve;

/// Stateless pipeline. Holds only immutable configuration and can be shared
/// between concurrent scans; each scan writes its own uniquely named file.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    codec: Codec,
    transport: TransportClient,
    store: ArtifactStore,
    title: String,
}

impl ScanPipeline {
    pub fn new(codec: Codec, transport: TransportClient, store: ArtifactStore, title: String) -> Self {
        Self {
            codec,
            transport,
            store,
            title,
        }
    }

    /// Builds a pipeline from configuration.
    ///
    /// Bad key material or configuration values fail here, before any
    /// network request can be made.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let codec = Codec::from_base64_key(&config.crypto.key_base64)?;
        let transport = TransportClient::new(
            &config.service.endpoint,
            &config.service.auth_token,
            Duration::from_secs(config.service.timeout_secs),
        )?;
        let store = ArtifactStore::new(&config.output.directory, config.output.file_prefix.as_str());
        Ok(Self::new(codec, transport, store, config.scan.title.clone()))
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Runs one scan with the configured title.
    pub async fn run(&self, images: Vec<Vec<u8>>) -> Result<PersistedArtifact, PipelineError> {
        let title = self.title.clone();
        self.run_with_title(images, &title).await
    }

    /// Runs one scan, sending `title` as the form type.
    pub async fn run_with_title(
        &self,
        images: Vec<Vec<u8>>,
        title: &str,
    ) -> Result<PersistedArtifact, PipelineError> {
        let result = self.execute(images, title).await;
        match &result {
            Ok(artifact) => info!("✅ Scan complete: {}", artifact.path.display()),
            Err(e) => error!("❌ Scan failed: {}", e),
        }
        result
    }

    async fn execute(
        &self,
        images: Vec<Vec<u8>>,
        title: &str,
    ) -> Result<PersistedArtifact, PipelineError> {
        info!("--- Starting scan of {} images ('{}') ---", images.len(), title);

        let plaintext = ScanRequest::from_images(&images, title)
            .to_bytes()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        drop(images);

        let sealed = self.codec.seal(&plaintext)?;
        let body = self.transport.send(&sealed).await?;
        let table_plaintext = unwrap_table(&body, &self.codec)?;
        let records = resolve(&table_plaintext)?;
        let table = flatten(&records);

        let store = self.store.clone();
        let artifact = tokio::task::spawn_blocking(move || store.persist(&table))
            .await
            .map_err(|e| PipelineError::Aborted(e.to_string()))??;
        Ok(artifact)
    }

    /// Runs the scan on a background task.
    ///
    /// The returned [`ScanTask`] resolves exactly once with the terminal
    /// result.
    pub fn spawn(self: &Arc<Self>, images: Vec<Vec<u8>>) -> ScanTask {
        self.spawn_with_title(images, self.title.clone())
    }

    /// Like [`ScanPipeline::spawn`], sending `title` as the form type.
    pub fn spawn_with_title(self: &Arc<Self>, images: Vec<Vec<u8>>, title: String) -> ScanTask {
        let pipeline = Arc::clone(self);
        ScanTask {
            handle: tokio::spawn(async move { pipeline.run_with_title(images, &title).await }),
        }
    }
}

/// Handle to a scan running in the background.
///
/// Awaiting it yields the scan's result. Dropping it detaches the scan,
/// which still runs to completion.
#[derive(Debug)]
pub struct ScanTask {
    handle: JoinHandle<Result<PersistedArtifact, PipelineError>>,
}

impl ScanTask {
    /// Stops the scan at its next await point. Awaiting the task afterwards
    /// yields [`PipelineError::Aborted`].
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for ScanTask {
    type Output = Result<PersistedArtifact, PipelineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(PipelineError::Aborted(e.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}
