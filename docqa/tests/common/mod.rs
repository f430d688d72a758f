//! Shared test doubles for the pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa::{ChatModel, DocqaError, EmbeddingProvider, Result};

/// Deterministic pseudo-embedding derived from the text content.
pub fn deterministic_vector(text: &str, dimension: usize) -> Vec<f32> {
    let seed = text.bytes().fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    (0..dimension)
        .map(|i| (seed.wrapping_add(i as u32).wrapping_mul(2_654_435_761) % 1000) as f32 / 1000.0)
        .collect()
}

/// Text of `len` characters cycling through the alphabet, so consecutive
/// fixed windows never repeat.
pub fn text_of_len(len: usize) -> String {
    (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

/// An [`EmbeddingProvider`] with scriptable failure modes and a call counter.
pub struct StubEmbedder {
    dimension: usize,
    calls: AtomicUsize,
    wrong_length_marker: Option<&'static str>,
    fail_marker: Option<&'static str>,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, calls: AtomicUsize::new(0), wrong_length_marker: None, fail_marker: None }
    }

    /// Return a wrong-length vector for any text containing `marker`.
    pub fn wrong_length_on(mut self, marker: &'static str) -> Self {
        self.wrong_length_marker = Some(marker);
        self
    }

    /// Fail with a service error for any text containing `marker`.
    pub fn fail_on(mut self, marker: &'static str) -> Self {
        self.fail_marker = Some(marker);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = self.fail_marker {
            if text.contains(marker) {
                return Err(DocqaError::EmbeddingService {
                    provider: "stub".to_string(),
                    message: "connection reset".to_string(),
                });
            }
        }
        if let Some(marker) = self.wrong_length_marker {
            if text.contains(marker) {
                return Ok(vec![0.5; self.dimension + 1]);
            }
        }
        Ok(deterministic_vector(text, self.dimension))
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}

/// A [`ChatModel`] returning a fixed reply and counting invocations.
pub struct StubChat {
    reply: &'static str,
    calls: AtomicUsize,
}

impl StubChat {
    pub fn new(reply: &'static str) -> Self {
        Self { reply, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for StubChat {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}
