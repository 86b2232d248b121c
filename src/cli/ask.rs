//! `askgate ask` command handler.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Result;

use askgate::config::Config;
use askgate::AskGateError;

use super::common::build_gateway;

/// Send one question through a fresh local gateway.
pub(crate) async fn cmd_ask(config: Config, user: String, question: String) -> Result<()> {
    let gateway = build_gateway(&config)?;
    match gateway
        .ask(&user, IpAddr::V4(Ipv4Addr::LOCALHOST), &question)
        .await
    {
        Ok(answer) => {
            println!("{}", answer.answer);
            println!();
            println!("Remaining today: {}", answer.remaining);
            Ok(())
        }
        // The CLI operator owns the credentials, so show the real cause.
        Err(AskGateError::Provider(e)) => anyhow::bail!("Completion provider failed: {e}"),
        Err(e) => Err(e.into()),
    }
}
