use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    gateway::MidtransClient,
    vision::VisionClient,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub gateway: MidtransClient,
    pub vision: VisionClient,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, config: &AppConfig) -> Self {
        Self {
            pool,
            orm,
            gateway: MidtransClient::new(&config.midtrans_base_url, &config.midtrans_server_key),
            vision: VisionClient::new(
                config.cloudinary_cloud_name.clone(),
                config.cloudinary_upload_preset.clone(),
                config.gemini_api_key.clone(),
            ),
        }
    }
}
