use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorTooManyRequests,
    middleware::Next,
};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_REQUESTS: usize = 10;
const WINDOW_DURATION: Duration = Duration::from_secs(60);

/// Per-IP sliding window limiter for the login route.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<DashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(DashMap::new()),
        }
    }

    pub fn check_rate_limit(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let cutoff = now - WINDOW_DURATION;

        let mut entry = self.requests.entry(ip).or_insert_with(Vec::new);

        // Remove old entries
        entry.retain(|&timestamp| timestamp > cutoff);

        if entry.len() >= MAX_REQUESTS {
            return false;
        }

        entry.push(now);
        true
    }

    pub fn cleanup_old_entries(&self) {
        let cutoff = Instant::now() - WINDOW_DURATION;

        self.requests.retain(|_, timestamps| {
            timestamps.retain(|&timestamp| timestamp > cutoff);
            !timestamps.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn rate_limit_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let peer_addr = req
        .peer_addr()
        .ok_or_else(|| ErrorTooManyRequests("Unable to determine client IP"))?;

    let ip = peer_addr.ip();

    let rate_limiter = req
        .app_data::<actix_web::web::Data<RateLimiter>>()
        .ok_or_else(|| ErrorTooManyRequests("Rate limiter not available"))?;

    if !rate_limiter.check_rate_limit(ip) {
        log::warn!("Rate limit exceeded for IP: {}", ip);
        return Err(ErrorTooManyRequests("Too many requests"));
    }

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_limit_enforced_per_ip() {
        let limiter = RateLimiter::new();
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        for _ in 0..MAX_REQUESTS {
            assert!(limiter.check_rate_limit(ip));
        }
        assert!(!limiter.check_rate_limit(ip));

        // A different IP is unaffected
        assert!(limiter.check_rate_limit(other));
    }
}
