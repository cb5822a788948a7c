use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use herdbook_ai::{AiError, TextGenerator};
use herdbook_core::OwnerId;

use crate::store::InMemoryHerdStore;

pub(crate) fn store() -> Arc<InMemoryHerdStore> {
    Arc::new(InMemoryHerdStore::new())
}

pub(crate) fn owner() -> OwnerId {
    OwnerId::new()
}

/// Generator returning a fixed reply and counting how often it was asked.
pub(crate) struct ScriptedGenerator {
    reply: Result<String, AiError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub(crate) fn replying(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(err: AiError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn stalling(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(String::new()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

/// A reply classifying `cow-1` and `cow-2`.
pub(crate) const TWO_COW_SUMMARY: &str = r#"{
  "highPerformers": ["cow-1"],
  "lowPerformers": [],
  "concerningTrends": [],
  "averagePerformers": ["cow-2"],
  "potentialRecordErrors": [],
  "insufficientData": [],
  "insights": "cow-1 is gaining fastest."
}"#;
