//! Boundary to the external chat classifier.

use std::sync::Arc;

use async_trait::async_trait;
use crowdprice_config::ClassifierConfig;
use crowdprice_primitives::{Timestamp, UserId, VoteIntent, VoteKind};
use hashlink::LruCache;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::{ClassificationError, InvalidInput};

/// One raw chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub user: UserId,
    pub text: String,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn new(user: impl Into<UserId>, text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// What the classifier made of a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: VoteKind,
    pub confidence: f64,
}

/// Turns raw chat text into a vote kind.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, message: &ChatMessage) -> Result<Classification, ClassificationError>;
}

/// Wraps a [`Classifier`] with message length checks and an ignore list for
/// text that keeps failing to classify.
///
/// Each failure raises the skip probability of that exact text by
/// `ignore_increment`, up to 1.0. Skips and failures both yield a NONE
/// intent. At most `ignore_capacity` texts are tracked; the list is cleared
/// when a session ends.
pub struct ClassifierGate {
    classifier: Arc<dyn Classifier>,
    config: ClassifierConfig,
    ignored: Mutex<LruCache<String, f64>>,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for ClassifierGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierGate")
            .field("config", &self.config)
            .field("ignored", &self.ignored.lock().len())
            .finish_non_exhaustive()
    }
}

impl ClassifierGate {
    pub fn new(classifier: Arc<dyn Classifier>, config: ClassifierConfig) -> Self {
        Self::with_rng(classifier, config, StdRng::from_os_rng())
    }

    /// Deterministic skip decisions.
    pub fn seeded(classifier: Arc<dyn Classifier>, config: ClassifierConfig, seed: u64) -> Self {
        Self::with_rng(classifier, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(classifier: Arc<dyn Classifier>, config: ClassifierConfig, rng: StdRng) -> Self {
        Self {
            ignored: Mutex::new(LruCache::new(config.ignore_capacity)),
            classifier,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Classify `message` into an intent. Never fails on classifier errors.
    pub async fn classify(&self, message: &ChatMessage) -> Result<VoteIntent, InvalidInput> {
        let len = message.text.chars().count();
        if len > self.config.max_message_len {
            return Err(InvalidInput::MessageTooLong {
                len,
                max: self.config.max_message_len,
            });
        }

        if self.should_skip(&message.text) {
            trace!(user = %message.user, "skipping previously unclassifiable message");
            return Ok(none(message));
        }

        match self.classifier.classify(message).await {
            Ok(classification) => Ok(VoteIntent::new(
                message.user.clone(),
                classification.kind,
                message.timestamp,
            )
            .with_confidence(classification.confidence)),
            Err(error) => {
                let probability = self.remember_failure(&message.text);
                debug!(user = %message.user, %error, probability, "classification failed");
                Ok(none(message))
            }
        }
    }

    /// Current skip probability for `text`.
    pub fn ignore_probability(&self, text: &str) -> f64 {
        self.ignored.lock().peek(text).copied().unwrap_or(0.0)
    }

    pub fn ignored_len(&self) -> usize {
        self.ignored.lock().len()
    }

    /// Forget every remembered failure.
    pub fn clear_ignored(&self) {
        let mut ignored = self.ignored.lock();
        debug!(cleared = ignored.len(), "classifier ignore list cleared");
        ignored.clear();
    }

    fn should_skip(&self, text: &str) -> bool {
        let probability = self.ignore_probability(text);
        probability > 0.0 && self.rng.lock().random::<f64>() < probability
    }

    fn remember_failure(&self, text: &str) -> f64 {
        let mut ignored = self.ignored.lock();
        let probability = (ignored.get(text).copied().unwrap_or(0.0) + self.config.ignore_increment).min(1.0);
        ignored.insert(text.to_owned(), probability);
        probability
    }
}

fn none(message: &ChatMessage) -> VoteIntent {
    VoteIntent::new(message.user.clone(), VoteKind::None, message.timestamp).with_confidence(0.0)
}
