//! Answer gateway: quota admission around one completion call.
//!
//! Per request:
//! 1. build the [`ClientKey`] from the user identifier and network address
//! 2. reserve a quota slot, or reject with [`AskGateError::QuotaExceeded`]
//!    (no provider call, nothing recorded)
//! 3. render the geography prompt and call the provider, with no ledger
//!    lock held
//! 4. on success record usage and return the answer with the remaining quota;
//!    on failure release the slot and return [`AskGateError::Provider`]

pub mod prompt;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{AskGateError, Result};
use crate::providers::{CompletionProvider, ProviderError};
use crate::quota::{ClientKey, Clock, QuotaLedger, SystemClock};

/// A successful answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    /// Requests left for this client today, after this one.
    pub remaining: u32,
}

pub struct AnswerGateway {
    ledger: Arc<QuotaLedger>,
    provider: Arc<dyn CompletionProvider>,
    clock: Arc<dyn Clock>,
    call_timeout: Option<Duration>,
}

impl std::fmt::Debug for AnswerGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGateway")
            .field("limit", &self.ledger.limit())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl AnswerGateway {
    pub fn new(ledger: Arc<QuotaLedger>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            ledger,
            provider,
            clock: Arc::new(SystemClock),
            call_timeout: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound each provider call. Expiry counts as a provider failure.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn ledger(&self) -> &Arc<QuotaLedger> {
        &self.ledger
    }

    /// Answer `question` for `user_id` calling from `addr`.
    pub async fn ask(&self, user_id: &str, addr: IpAddr, question: &str) -> Result<Answer> {
        let key = ClientKey::new(user_id, addr);
        let span = info_span!("ask", client = %key, request_id = %uuid::Uuid::new_v4());
        self.ask_as(&key, question).instrument(span).await
    }

    async fn ask_as(&self, key: &ClientKey, question: &str) -> Result<Answer> {
        info!(question_len = question.len(), "question received");
        debug!(question, "question text");

        let Some(admission) = self.ledger.try_admit(key, self.clock.now()) else {
            warn!(limit = self.ledger.limit(), "daily free limit reached");
            return Err(AskGateError::QuotaExceeded(format!(
                "{key} used all {} requests for today",
                self.ledger.limit()
            )));
        };

        let prompt = prompt::render(question);
        match self.call(&prompt).await {
            Ok(answer) => {
                let remaining = admission.commit(self.clock.now());
                info!(remaining, "question answered");
                Ok(Answer { answer, remaining })
            }
            Err(e) => {
                // Releasing the slot here leaves the client's count untouched.
                drop(admission);
                error!(error = %e, "completion provider failed");
                Err(e.into())
            }
        }
    }

    async fn call(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.complete(prompt))
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => self.provider.complete(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockCompletionProvider;
    use crate::quota::{ManualClock, DAILY_LIMIT};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::net::Ipv4Addr;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4));

    fn ok_provider() -> MockCompletionProvider {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .returning(|_| Ok("Nairobi".to_string()));
        mock
    }

    fn gateway_with(provider: MockCompletionProvider) -> AnswerGateway {
        AnswerGateway::new(Arc::new(QuotaLedger::new()), Arc::new(provider))
    }

    #[tokio::test]
    async fn test_answer_and_remaining() {
        let gateway = gateway_with(ok_provider());
        let answer = gateway
            .ask("alice", ADDR, "Capital of Kenya?")
            .await
            .unwrap();
        assert_eq!(answer.answer, "Nairobi");
        assert_eq!(answer.remaining, DAILY_LIMIT - 1);
    }

    #[tokio::test]
    async fn test_prompt_reaches_provider() {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .withf(|prompt| {
                prompt.contains("geography expert") && prompt.ends_with("Question: Where is Oslo?\n")
            })
            .times(1)
            .returning(|_| Ok("Norway".to_string()));
        let gateway = gateway_with(mock);
        gateway.ask("alice", ADDR, "Where is Oslo?").await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_quota_skips_provider() {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .times(DAILY_LIMIT as usize)
            .returning(|_| Ok("ok".to_string()));
        let gateway = gateway_with(mock);

        for expected in (0..DAILY_LIMIT).rev() {
            let answer = gateway.ask("alice", ADDR, "q").await.unwrap();
            assert_eq!(answer.remaining, expected);
        }

        let err = gateway.ask("alice", ADDR, "q").await.unwrap_err();
        assert!(matches!(err, AskGateError::QuotaExceeded(_)), "got {err:?}");
        let key = ClientKey::new("alice", ADDR);
        assert_eq!(gateway.ledger().count(&key, Utc::now()), DAILY_LIMIT);
    }

    #[tokio::test]
    async fn test_provider_failure_records_nothing() {
        let mut mock = MockCompletionProvider::new();
        let mut calls = 0;
        mock.expect_complete().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(ProviderError::ServerError("HTTP 502: bad gateway".into()))
            } else {
                Ok("fine".to_string())
            }
        });
        let gateway = gateway_with(mock);
        let key = ClientKey::new("alice", ADDR);

        let err = gateway.ask("alice", ADDR, "q").await.unwrap_err();
        assert!(matches!(
            err,
            AskGateError::Provider(ProviderError::ServerError(_))
        ));
        assert_eq!(gateway.ledger().count(&key, Utc::now()), 0);

        let answer = gateway.ask("alice", ADDR, "q").await.unwrap();
        assert_eq!(answer.remaining, DAILY_LIMIT - 1);
    }

    #[tokio::test]
    async fn test_new_day_restores_quota() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap(),
        ));
        let gateway = gateway_with(ok_provider()).with_clock(clock.clone());

        for _ in 0..DAILY_LIMIT {
            gateway.ask("alice", ADDR, "q").await.unwrap();
        }
        assert!(gateway.ask("alice", ADDR, "q").await.is_err());

        clock.set(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 1).unwrap());
        let answer = gateway.ask("alice", ADDR, "q").await.unwrap();
        assert_eq!(answer.remaining, DAILY_LIMIT - 1);
    }

    struct SlowProvider;

    #[async_trait]
    impl CompletionProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-model"
        }

        async fn complete(&self, _prompt: &str) -> std::result::Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_call_timeout_is_provider_failure() {
        let gateway = AnswerGateway::new(Arc::new(QuotaLedger::new()), Arc::new(SlowProvider))
            .with_call_timeout(Some(Duration::from_millis(50)));

        let err = gateway.ask("alice", ADDR, "q").await.unwrap_err();
        assert!(
            matches!(
                err,
                AskGateError::Provider(ProviderError::Timeout(d)) if d == Duration::from_millis(50)
            ),
            "got {err:?}"
        );
        assert!(err.to_string().contains("50ms"), "got {err}");
        assert_eq!(gateway.ledger().count(&ClientKey::new("alice", ADDR), Utc::now()), 0);
    }

    /// Suspends once per call so concurrent asks interleave between
    /// admission and commit.
    struct YieldingProvider;

    #[async_trait]
    impl CompletionProvider for YieldingProvider {
        fn name(&self) -> &str {
            "yielding"
        }

        fn model(&self) -> &str {
            "yielding-model"
        }

        async fn complete(&self, _prompt: &str) -> std::result::Result<String, ProviderError> {
            tokio::task::yield_now().await;
            Ok("eventually".to_string())
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_one_key_stay_within_limit() {
        let gateway = Arc::new(AnswerGateway::new(
            Arc::new(QuotaLedger::new()),
            Arc::new(YieldingProvider),
        ));
        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let gateway = Arc::clone(&gateway);
                tokio::spawn(async move { gateway.ask("alice", ADDR, "q").await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let admitted = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(admitted, DAILY_LIMIT as usize);
        assert_eq!(
            gateway
                .ledger()
                .count(&ClientKey::new("alice", ADDR), Utc::now()),
            DAILY_LIMIT
        );
    }
}
