use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::Mailer;
use crate::upload::ImageUploader;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub uploader: Option<Arc<dyn ImageUploader>>,
}
