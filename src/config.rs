use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub midtrans_server_key: String,
    pub midtrans_base_url: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let midtrans_server_key = env::var("MIDTRANS_SERVER_KEY")?;
        let midtrans_base_url = env::var("MIDTRANS_BASE_URL")
            .unwrap_or_else(|_| "https://app.sandbox.midtrans.com".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            midtrans_server_key,
            midtrans_base_url,
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME").ok(),
            cloudinary_upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
        })
    }
}
