//! 按客户端 IP 限流
//!
//! `GovernorConfig` 内部持有共享的限流器，启动时构建一次后克隆进每个
//! worker，所有 worker 共用同一份计数。`rate_limits.enabled = false` 时
//! 通过 `Condition` 跳过。

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError,
};
use actix_web::dev::ServiceRequest;
use actix_web::middleware::Condition;
use governor::middleware::NoOpMiddleware;
use tracing::debug;

use crate::config::{RateLimitRule, RateLimitsConfig};
use crate::utils::ip::extract_client_ip;

/// 基于真实客户端 IP 的 key 提取器
///
/// 与评论、点赞的 IP 归属使用同一套可信代理规则。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        extract_client_ip(req.request())
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract client IP"))
    }
}

pub type IpRateLimiter = Condition<Governor<ClientIpKeyExtractor, NoOpMiddleware>>;

/// 单条限流规则
#[derive(Clone)]
pub struct RateLimit {
    enabled: bool,
    config: GovernorConfig<ClientIpKeyExtractor, NoOpMiddleware>,
}

impl RateLimit {
    pub fn new(name: &str, rule: RateLimitRule, enabled: bool) -> Self {
        let replenish_ms = rule.replenish_ms.max(1);
        let burst = rule.burst.max(1);

        // 两个参数都已保证非零，finish() 只会在零值时返回 None
        let config = GovernorConfigBuilder::default()
            .milliseconds_per_request(replenish_ms)
            .burst_size(burst)
            .key_extractor(ClientIpKeyExtractor)
            .finish()
            .expect("Invalid rate limit config");

        debug!(
            "Rate limiter '{}': 1 req / {} ms, burst {}, enabled: {}",
            name, replenish_ms, burst, enabled
        );
        Self { enabled, config }
    }

    pub fn middleware(&self) -> IpRateLimiter {
        Condition::new(self.enabled, Governor::new(&self.config))
    }
}

/// 各接口的限流器
#[derive(Clone)]
pub struct ApiRateLimits {
    pub comment_create: RateLimit,
    pub comment_reply: RateLimit,
    pub comment_like: RateLimit,
    pub captcha: RateLimit,
    pub preview: RateLimit,
    pub upload: RateLimit,
    pub bulk_upload: RateLimit,
    pub login: RateLimit,
    pub register: RateLimit,
    pub change_password: RateLimit,
}

impl ApiRateLimits {
    pub fn from_config(config: &RateLimitsConfig) -> Self {
        let on = config.enabled;
        Self {
            comment_create: RateLimit::new("comment_create", config.comment_create, on),
            comment_reply: RateLimit::new("comment_reply", config.comment_reply, on),
            comment_like: RateLimit::new("comment_like", config.comment_like, on),
            captcha: RateLimit::new("captcha", config.captcha, on),
            preview: RateLimit::new("preview", config.preview, on),
            upload: RateLimit::new("upload", config.upload, on),
            bulk_upload: RateLimit::new("bulk_upload", config.bulk_upload, on),
            login: RateLimit::new("login", config.login, on),
            register: RateLimit::new("register", config.register, on),
            change_password: RateLimit::new("change_password", config.change_password, on),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_key_extractor_uses_peer_ip() {
        let req = TestRequest::default()
            .peer_addr("203.0.113.9:5555".parse().unwrap())
            .to_srv_request();
        let key = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(key, "203.0.113.9");
    }

    #[test]
    fn test_key_extractor_without_peer_fails() {
        let req = TestRequest::default().to_srv_request();
        assert!(ClientIpKeyExtractor.extract(&req).is_err());
    }

    #[test]
    fn test_zero_rule_is_clamped() {
        let rule = RateLimitRule {
            replenish_ms: 0,
            burst: 0,
        };
        let limit = RateLimit::new("zero", rule, true);
        let _ = limit.middleware();
    }
}
