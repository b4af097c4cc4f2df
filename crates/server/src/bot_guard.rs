use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use crate::config::ServerConfig;

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    MissingUserAgent,
    Bot,
    BlockedIp,
}

impl BlockReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingUserAgent => "Blocked: Missing User-Agent",
            Self::Bot => "Blocked: Bot detected",
            Self::BlockedIp => "Blocked: IP not allowed",
        }
    }
}

/// User-agent and IP deny lists applied to every page and API route.
#[derive(Clone)]
pub struct BotGuard {
    inner: Arc<BotGuardInner>,
}

struct BotGuardInner {
    patterns: Vec<String>,
    blocked_ips: Vec<String>,
}

impl BotGuard {
    pub fn new(patterns: Vec<String>, blocked_ips: Vec<String>) -> Self {
        Self {
            inner: Arc::new(BotGuardInner {
                patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
                blocked_ips,
            }),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.bot_patterns.clone(), config.blocked_ips.clone())
    }

    pub fn check(&self, user_agent: Option<&str>, ip: &str) -> Result<(), BlockReason> {
        let user_agent = user_agent.unwrap_or("");
        if user_agent.is_empty() {
            return Err(BlockReason::MissingUserAgent);
        }

        let ua = user_agent.to_lowercase();
        if self.inner.patterns.iter().any(|p| ua.contains(p.as_str())) {
            return Err(BlockReason::Bot);
        }

        if self.inner.blocked_ips.iter().any(|b| b == ip) {
            return Err(BlockReason::BlockedIp);
        }
        Ok(())
    }
}

/// Peer address if the server was started with connect info, then the first
/// `X-Forwarded-For` hop, then `unknown`.
fn client_ip(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Request filtering middleware. Expects a `BotGuard` extension.
pub async fn bot_guard_middleware(request: Request, next: Next) -> Response {
    let Some(guard) = request.extensions().get::<BotGuard>().cloned() else {
        return next.run(request).await;
    };

    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let ip = client_ip(&request);

    match guard.check(user_agent, &ip) {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            warn!(
                ip = %ip,
                user_agent = user_agent.unwrap_or(""),
                path = %request.uri().path(),
                ?reason,
                "request blocked"
            );
            (StatusCode::FORBIDDEN, reason.message()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> BotGuard {
        BotGuard::from_config(&ServerConfig::default())
    }

    #[test]
    fn missing_user_agent_is_blocked() {
        assert_eq!(guard().check(None, "5.6.7.8"), Err(BlockReason::MissingUserAgent));
        assert_eq!(guard().check(Some(""), "5.6.7.8"), Err(BlockReason::MissingUserAgent));
    }

    #[test]
    fn bot_patterns_match_case_insensitively() {
        for ua in ["curl/8.4.0", "Python-Requests/2.31", "okhttp/4.12", "Java/17.0.2"] {
            assert_eq!(guard().check(Some(ua), "5.6.7.8"), Err(BlockReason::Bot), "{ua}");
        }
    }

    #[test]
    fn blocked_ip_and_browsers() {
        let browser = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";
        assert_eq!(guard().check(Some(browser), "1.2.3.4"), Err(BlockReason::BlockedIp));
        assert_eq!(guard().check(Some(browser), "5.6.7.8"), Ok(()));
        assert_eq!(guard().check(Some(browser), "unknown"), Ok(()));
    }
}
