pub mod config;
pub mod files;
pub mod hub;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

pub struct AppState {
    pub config: config::AppConfig,
    pub db: minichat_shared::clients::db::DbPool,
    pub chat: services::ChatService,
    pub files: files::FileStore,
    pub request_logs: minichat_shared::request_log::PgRequestLogs,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
