#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub redis_url: Option<String>,
    pub cache_ttl_seconds: u64,
    pub expose_internal_errors: bool,
    pub frontend_url: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        // Redis es opcional: sin REDIS_URL el servidor corre sin caché.
        let redis_url = std::env::var("REDIS_URL").ok();
        let cache_ttl_seconds = std::env::var("CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);
        let expose_internal_errors = std::env::var("EXPOSE_INTERNAL_ERRORS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let frontend_url = std::env::var("FRONTEND_URL").ok();
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage
                .parse::<i64>()
                .expect("JWT_MAXAGE must be an integer (seconds)"),
            redis_url,
            cache_ttl_seconds,
            expose_internal_errors,
            frontend_url,
            port,
        }
    }
}
