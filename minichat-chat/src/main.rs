use axum::{routing::{delete, get, post, put}, Router, extract::DefaultBodyLimit};
use socketioxide::SocketIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use minichat_chat::config::AppConfig;
use minichat_chat::files::FileStore;
use minichat_chat::hub::{handlers, SocketHub};
use minichat_chat::routes::{attachments, groups, health, logs, messages, users};
use minichat_chat::services::ChatService;
use minichat_chat::store::PgStore;
use minichat_chat::AppState;
use minichat_shared::clients::db::create_pool;
use minichat_shared::middleware::{init_metrics, metrics_middleware, request_log_middleware, SharedLogSink};
use minichat_shared::request_log::PgRequestLogs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    minichat_shared::middleware::init_tracing("minichat-chat");

    let config = AppConfig::load()?;
    let port = config.port;
    let max_upload_bytes = config.max_upload_bytes;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let files = FileStore::open(&config.upload_dir).await?;
    let metrics_handle = init_metrics()?;
    let request_logs = PgRequestLogs::new(db.clone());
    let log_sink: SharedLogSink = Arc::new(request_logs.clone());

    // Socket.IO layer; the hub emits through `io` from REST handlers
    let (sio_layer, io) = SocketIo::builder().build_layer();
    io.ns("/", handlers::on_connect);

    let chat = ChatService::new(
        Arc::new(PgStore::new(db.clone())),
        Arc::new(SocketHub::new(io)),
        config.history_max_count,
    );

    let state = Arc::new(AppState {
        config,
        db,
        chat,
        files,
        request_logs,
        metrics_handle,
    });

    let app = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Messages
        .route("/messages", get(messages::history).post(messages::send_message))
        .route("/messages/:id", put(messages::edit_message).delete(messages::delete_message))
        .route("/conversation/search", get(messages::search))
        // Attachments
        .route("/messages/upload", post(attachments::upload)
            .layer(DefaultBodyLimit::max(max_upload_bytes)))
        .route("/download/:message_id", get(attachments::download))
        // Groups
        .route("/groups", post(groups::create_group))
        .route("/groups/:id", delete(groups::delete_group))
        .route("/groups/:id/name", put(groups::rename_group))
        .route("/groups/:id/members", post(groups::add_member))
        .route("/groups/:id/members/:member_id", delete(groups::remove_member))
        .route("/groups/:id/members/:member_id/admin", put(groups::make_admin))
        // Directory and audit
        .route("/users", get(users::list_users))
        .route("/log", get(logs::list_logs))
        .layer(sio_layer)
        .layer(axum::middleware::from_fn_with_state(log_sink, request_log_middleware))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "minichat-chat starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
