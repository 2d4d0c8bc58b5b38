use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns `true` while `key` is within `limit` for the window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = rate_limit_pipeline(key, window_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

/// The TTL is only set when the window opens; `INCR` keeps it, so the window never slides.
fn rate_limit_pipeline(key: &str, window_seconds: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET").arg(key).arg(0).arg("EX").arg(window_seconds).arg("NX").ignore()
        .incr(key, 1);
    pipe
}

pub fn rate_limit_key(client: &str) -> String {
    format!("rentx:ratelimit:{}", client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_window_is_not_extended() {
        let packed = rate_limit_pipeline("rentx:ratelimit:10.0.0.1", 60).get_packed_pipeline();
        let text = String::from_utf8_lossy(&packed);

        assert!(text.contains("SET"));
        assert!(text.contains("NX"));
        assert!(text.contains("INCR"));
        assert!(!text.contains("EXPIRE"));
        assert!(text.find("SET").unwrap() < text.find("INCR").unwrap());
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(rate_limit_key("10.0.0.1"), "rentx:ratelimit:10.0.0.1");
    }
}
