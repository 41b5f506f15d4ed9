/// Configuration management for the image service
///
/// Loads configuration from environment variables with sensible defaults.
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub s3: S3Config,
    pub upload: UploadConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UploadConfig {
    /// Logical folder prefix for uploaded objects, always ends with '/'
    pub path_prefix: String,
    /// Maximum accepted multipart payload size in bytes
    pub max_upload_bytes: usize,
    /// JPEG quality (0-100) for encoded variants
    pub jpeg_quality: u8,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: std::env::var("IMAGE_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("IMAGE_SERVICE_PORT")
                    .unwrap_or_else(|_| "6050".to_string())
                    .parse()
                    .unwrap_or(6050),
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            cors: CorsConfig {
                allowed_origins: parse_allowed_origins(),
            },
            s3: S3Config {
                bucket: std::env::var("S3_BUCKET").unwrap_or_default(),
                region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
                endpoint: std::env::var("S3_ENDPOINT").ok(),
            },
            upload: UploadConfig {
                path_prefix: normalize_prefix(
                    std::env::var("UPLOAD_PATH_PREFIX").unwrap_or_else(|_| "images/".to_string()),
                ),
                max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10 << 20),
                jpeg_quality: std::env::var("JPEG_QUALITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(85),
            },
        }
    }
}

fn parse_allowed_origins() -> Vec<String> {
    match std::env::var("CORS_ALLOWED_ORIGINS") {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => vec!["*".to_string()],
    }
}

fn normalize_prefix(prefix: String) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix
    } else {
        format!("{prefix}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_gets_trailing_slash() {
        assert_eq!(normalize_prefix("images".to_string()), "images/");
        assert_eq!(normalize_prefix("images/".to_string()), "images/");
        assert_eq!(normalize_prefix(String::new()), "");
    }
}
