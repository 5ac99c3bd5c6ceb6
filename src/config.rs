use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub base_url: String,
    pub poster_cache_path: String,
    pub output_path: String,
    pub poster_width: u32,
    pub poster_height: u32,
    pub workers: usize,
    pub http_timeout_secs: u64,
    pub page_delay_ms: u64,
    pub max_diary_pages: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("BOXD_PORT")
                .unwrap_or_else(|_| "18474".to_string())
                .parse()?,
            host: env::var("BOXD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            base_url: env::var("BOXD_BASE_URL")
                .unwrap_or_else(|_| "https://letterboxd.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            poster_cache_path: env::var("BOXD_POSTER_CACHE_PATH")
                .unwrap_or_else(|_| "./data/posters".to_string()),
            output_path: env::var("BOXD_OUTPUT_PATH").unwrap_or_else(|_| "./output".to_string()),
            poster_width: env::var("BOXD_POSTER_WIDTH")
                .unwrap_or_else(|_| "230".to_string())
                .parse()?,
            poster_height: env::var("BOXD_POSTER_HEIGHT")
                .unwrap_or_else(|_| "345".to_string())
                .parse()?,
            workers: env::var("BOXD_WORKERS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()?,
            http_timeout_secs: env::var("BOXD_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()?,
            page_delay_ms: env::var("BOXD_PAGE_DELAY_MS")
                .unwrap_or_else(|_| "750".to_string())
                .parse()?,
            max_diary_pages: env::var("BOXD_MAX_DIARY_PAGES")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
        })
    }
}
