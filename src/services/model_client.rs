use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::quiz_session::Credential;

/// One call to the generative-text provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, credential: &str, prompt: &str, temperature: f32) -> Result<String>;
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

/// Replies memoized by prompt text and temperature for the life of the process.
#[derive(Clone, Debug)]
pub struct ResponseCache {
    capacity: usize,
    state: Arc<Mutex<CacheState>>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    fn key(prompt: &str, temperature: f32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(temperature.to_bits().to_be_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, prompt: &str, temperature: f32) -> Option<String> {
        let guard = self.state.lock().expect("response cache mutex poisoned");
        guard.entries.get(&Self::key(prompt, temperature)).cloned()
    }

    pub fn insert(&self, prompt: &str, temperature: f32, reply: String) {
        let key = Self::key(prompt, temperature);
        let mut guard = self.state.lock().expect("response cache mutex poisoned");
        if guard.entries.insert(key.clone(), reply).is_none() {
            guard.order.push_back(key);
        }
        while guard.entries.len() > self.capacity {
            match guard.order.pop_front() {
                Some(oldest) => {
                    guard.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn forget(&self, prompt: &str, temperature: f32) {
        let key = Self::key(prompt, temperature);
        let mut guard = self.state.lock().expect("response cache mutex poisoned");
        if guard.entries.remove(&key).is_some() {
            guard.order.retain(|k| k != &key);
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("response cache mutex poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct ModelClient {
    generator: Arc<dyn TextGenerator>,
    cache: ResponseCache,
    max_attempts: u32,
    backoff: Duration,
}

impl ModelClient {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        cache: ResponseCache,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            generator,
            cache,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn generate(&self, credential: &Credential, prompt: &str, temperature: f32) -> Result<String> {
        if let Some(hit) = self.cache.get(prompt, temperature) {
            tracing::debug!(prompt_len = prompt.len(), "model reply served from cache");
            return Ok(hit);
        }
        let reply = self.call_with_retry(credential, prompt, temperature).await?;
        self.cache.insert(prompt, temperature, reply.clone());
        Ok(reply)
    }

    /// Skips the memo for a prompt whose cached reply was unusable.
    pub async fn regenerate(&self, credential: &Credential, prompt: &str, temperature: f32) -> Result<String> {
        self.cache.forget(prompt, temperature);
        self.generate(credential, prompt, temperature).await
    }

    async fn call_with_retry(&self, credential: &Credential, prompt: &str, temperature: f32) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.generator.generate(credential.expose(), prompt, temperature).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.max_attempts && matches!(e, Error::Service(_) | Error::Reqwest(_)) => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(attempt, max_attempts = self.max_attempts, delay_ms = delay.as_millis() as u64, error = %e, "model call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "model call failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(mock: MockTextGenerator, attempts: u32) -> ModelClient {
        ModelClient::new(Arc::new(mock), ResponseCache::new(8), attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn identical_prompts_hit_the_cache() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _, _| Ok("reply".to_string()));
        let client = client(mock, 1);
        let key = Credential::new("k");

        assert_eq!(client.generate(&key, "p", 0.7).await.unwrap(), "reply");
        assert_eq!(client.generate(&key, "p", 0.7).await.unwrap(), "reply");
        assert_eq!(client.cache().len(), 1);
    }

    #[tokio::test]
    async fn temperature_is_part_of_the_key() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(2)
            .returning(|_, _, t| Ok(format!("t={}", t)));
        let client = client(mock, 1);
        let key = Credential::new("k");

        assert_eq!(client.generate(&key, "p", 0.7).await.unwrap(), "t=0.7");
        assert_eq!(client.generate(&key, "p", 0.2).await.unwrap(), "t=0.2");
    }

    #[tokio::test]
    async fn regenerate_bypasses_the_cache() {
        let mut mock = MockTextGenerator::new();
        let mut calls = 0;
        mock.expect_generate().times(2).returning(move |_, _, _| {
            calls += 1;
            Ok(format!("reply {}", calls))
        });
        let client = client(mock, 1);
        let key = Credential::new("k");

        assert_eq!(client.generate(&key, "p", 0.7).await.unwrap(), "reply 1");
        assert_eq!(client.regenerate(&key, "p", 0.7).await.unwrap(), "reply 2");
        assert_eq!(client.generate(&key, "p", 0.7).await.unwrap(), "reply 2");
    }

    #[tokio::test]
    async fn service_errors_are_retried_up_to_the_cap() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(3)
            .returning(|_, _, _| Err(Error::Service("503".into())));
        let client = client(mock, 3);

        let err = client.generate(&Credential::new("k"), "p", 0.7).await.unwrap_err();
        assert!(matches!(err, Error::Service(_)));
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn a_retry_that_succeeds_is_cached() {
        let mut mock = MockTextGenerator::new();
        let mut calls = 0;
        mock.expect_generate().times(2).returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(Error::Service("timeout".into()))
            } else {
                Ok("late reply".to_string())
            }
        });
        let client = client(mock, 3);

        assert_eq!(client.generate(&Credential::new("k"), "p", 0.7).await.unwrap(), "late reply");
        assert_eq!(client.cache().get("p", 0.7).as_deref(), Some("late reply"));
    }

    #[test]
    fn cache_evicts_oldest_entries_beyond_capacity() {
        let cache = ResponseCache::new(2);
        cache.insert("a", 0.7, "1".into());
        cache.insert("b", 0.7, "2".into());
        cache.insert("c", 0.7, "3".into());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", 0.7).is_none());
        assert_eq!(cache.get("c", 0.7).as_deref(), Some("3"));
    }
}
