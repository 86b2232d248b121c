//! askgate: a quota-gated question answering gateway.
//!
//! One endpoint takes a user identifier and a question, checks the caller's
//! daily quota, asks an LLM completion service with a fixed geography-only
//! prompt, and returns the answer together with the quota left for the day.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod providers;
pub mod quota;

pub use config::Config;
pub use error::{AskGateError, Result};
pub use gateway::{Answer, AnswerGateway};
pub use providers::{CompletionProvider, OpenAIProvider, ProviderError};
pub use quota::{ClientKey, QuotaLedger, DAILY_LIMIT};
