//! Batched embedding generation

use std::path::Path;

use futures::future::try_join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::client::EmbeddingClient;
use super::error::EmbeddingError;
use super::types::BatchOptions;
use super::Embedding;

impl EmbeddingClient {
    /// Generate embeddings for many prompts
    ///
    /// Prompts are split into consecutive chunks of `options.batch_size`. The
    /// prompts of one chunk are embedded concurrently, and the client pauses for
    /// `options.batch_delay` between chunks. The first failure aborts the whole
    /// call. Results are returned in input order.
    pub async fn embed_batch<S>(
        &self,
        prompts: &[S],
        options: &BatchOptions,
    ) -> Result<Vec<Embedding>, EmbeddingError>
    where
        S: AsRef<str>,
    {
        self.embed_batch_with_progress(prompts, options, None).await
    }

    /// Like [`embed_batch`](Self::embed_batch), reporting the size of every
    /// completed chunk on `progress_sender`
    #[instrument(skip_all, fields(prompts = prompts.len(), batch_size = options.batch_size))]
    pub async fn embed_batch_with_progress<S>(
        &self,
        prompts: &[S],
        options: &BatchOptions,
        progress_sender: Option<mpsc::Sender<usize>>,
    ) -> Result<Vec<Embedding>, EmbeddingError>
    where
        S: AsRef<str>,
    {
        let batch_size = options.batch_size.max(1);
        let total_batches = prompts.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(prompts.len());

        for (index, batch) in prompts.chunks(batch_size).enumerate() {
            info!("Processing batch {}/{}", index + 1, total_batches);

            let embeddings = try_join_all(
                batch
                    .iter()
                    .map(|prompt| self.embed(prompt.as_ref(), &options.embed)),
            )
            .await?;
            results.extend(embeddings);

            if let Some(sender) = &progress_sender {
                // A dropped receiver only means nobody is watching
                let _ = sender.send(batch.len()).await;
            }

            if index + 1 < total_batches {
                debug!(
                    "Waiting {} ms before next batch",
                    options.batch_delay.as_millis()
                );
                tokio::time::sleep(options.batch_delay).await;
            }
        }

        Ok(results)
    }
}

/// Read prompts from a file, one per non-blank line
///
/// Line endings are stripped; the rest of each line is kept byte for byte.
pub async fn read_prompts(path: impl AsRef<Path>) -> crate::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}
