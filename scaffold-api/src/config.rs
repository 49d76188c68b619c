use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3000")]
    pub port: u16,

    #[envconfig(from = "REDIS_URL", default = "redis://localhost:6379/")]
    pub redis_url: String,

    #[envconfig(from = "REDIS_KEY_PREFIX", default = "scaffold")]
    pub redis_key_prefix: String,

    /// TTL for cached HTTP responses, in milliseconds.
    #[envconfig(from = "RESPONSE_CACHE_TTL_MS", default = "30000")]
    pub response_cache_ttl_ms: u64,

    #[envconfig(from = "EXPORT_PROMETHEUS", default = "true")]
    pub export_prometheus: bool,

    /// How long the HTTP server may go without a liveness heartbeat before
    /// the probe reports it stalled.
    #[envconfig(from = "LIVENESS_DEADLINE_SECS", default = "60")]
    pub liveness_deadline_secs: u64,

    /// Base URL of the example microservice; outbound calls are disabled
    /// when unset.
    #[envconfig(from = "EXAMPLE_SERVICE_URL")]
    pub example_service_url: Option<String>,

    #[envconfig(from = "MICROSERVICE_TIMEOUT_MS", default = "5000")]
    pub microservice_timeout_ms: u64,

    /// Emit logs as JSON instead of the human-readable format.
    #[envconfig(from = "LOG_JSON", default = "false")]
    pub log_json: bool,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::init_from_hashmap(&HashMap::new()).expect("defaults should parse");
        assert_eq!(config.bind(), ":::3000");
        assert_eq!(config.redis_url, "redis://localhost:6379/");
        assert_eq!(config.response_cache_ttl_ms, 30_000);
        assert!(config.export_prometheus);
        assert_eq!(config.example_service_url, None);
        assert_eq!(config.microservice_timeout_ms, 5_000);
        assert!(!config.log_json);
    }

    #[test]
    fn env_overrides() {
        let mut env = HashMap::new();
        env.insert("BIND_PORT".to_string(), "8080".to_string());
        env.insert("EXPORT_PROMETHEUS".to_string(), "false".to_string());
        let config = Config::init_from_hashmap(&env).expect("overrides should parse");
        assert_eq!(config.port, 8080);
        assert!(!config.export_prometheus);
    }
}
