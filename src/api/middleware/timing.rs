//! HTTP timing middleware
//!
//! Logs every request at debug level and slow requests at warn level,
//! tagged with the API area the path belongs to.

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 超过该耗时的请求记为慢请求
pub const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(1000);

/// HTTP timing middleware factory
#[derive(Clone)]
pub struct TimingMiddleware {
    api_prefix: Rc<str>,
    threshold: Duration,
}

impl TimingMiddleware {
    pub fn new(api_prefix: &str) -> Self {
        Self {
            api_prefix: Rc::from(api_prefix),
            threshold: SLOW_REQUEST_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for TimingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TimingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimingService {
            service: Rc::new(service),
            api_prefix: self.api_prefix.clone(),
            threshold: self.threshold,
        }))
    }
}

pub struct TimingService<S> {
    service: Rc<S>,
    api_prefix: Rc<str>,
    threshold: Duration,
}

impl<S, B> Service<ServiceRequest> for TimingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let threshold = self.threshold;
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let area = classify_endpoint(&path, &self.api_prefix);

        Box::pin(async move {
            let result = srv.call(req).await;
            let elapsed = start.elapsed();
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(_) => 500,
            };

            if elapsed >= threshold {
                warn!(
                    "Slow request: {} {} [{}] -> {} in {:?}",
                    method, path, area, status, elapsed
                );
            } else {
                debug!("{} {} [{}] -> {} in {:?}", method, path, area, status, elapsed);
            }

            result
        })
    }
}

/// 按路径归类到 API 分区，日志只按分区聚合
pub fn classify_endpoint(path: &str, api_prefix: &str) -> &'static str {
    if path.starts_with("/health") {
        return "health";
    }
    let Some(rest) = path.strip_prefix(api_prefix) else {
        return "other";
    };
    let rest = rest.trim_start_matches('/');
    if rest.starts_with("analytics") {
        "analytics"
    } else if rest.starts_with("comments") || rest.starts_with("captcha") {
        "comments"
    } else if rest.starts_with("files") || rest.starts_with("upload") {
        "files"
    } else if rest.starts_with("auth") || rest.starts_with("profile") || rest.starts_with("users")
    {
        "users"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_endpoint() {
        assert_eq!(classify_endpoint("/health/live", "/api"), "health");
        assert_eq!(classify_endpoint("/api/comments/1/like/", "/api"), "comments");
        assert_eq!(classify_endpoint("/api/captcha/generate/", "/api"), "comments");
        assert_eq!(classify_endpoint("/api/upload/bulk/", "/api"), "files");
        assert_eq!(classify_endpoint("/api/profile/stats/", "/api"), "users");
        assert_eq!(classify_endpoint("/api/analytics/dashboard/", "/api"), "analytics");
        assert_eq!(classify_endpoint("/favicon.ico", "/api"), "other");
    }
}
