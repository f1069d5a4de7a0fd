use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_extra_origins: Vec<String>,
    pub db_max_connections: u32,

    pub jwt_secret: String,
    pub jwt_access_ttl_secs: i64,

    /// Substitute sample chart data when a statistics query comes back empty.
    pub stats_sample_fallback: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|raw| parse_origin_list(&raw))
                .unwrap_or_default(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .unwrap_or(20),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_access_ttl_secs: env::var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "86400".into())
                .parse()
                .expect("JWT_ACCESS_TTL_SECS must be a number"),

            stats_sample_fallback: env::var("STATS_SAMPLE_FALLBACK")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/moodjournal_test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        cors_extra_origins: Vec::new(),
        db_max_connections: 1,
        jwt_secret: "test-secret-with-enough-entropy".into(),
        jwt_access_ttl_secs: 900,
        stats_sample_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origin_list_trims_and_skips_empty() {
        let origins = parse_origin_list(" http://a.local , ,http://b.local:3000,");
        assert_eq!(origins, vec!["http://a.local", "http://b.local:3000"]);
    }

    #[test]
    fn test_listen_addr() {
        let config = test_config();
        assert_eq!(config.listen_addr(), "127.0.0.1:0");
    }
}
