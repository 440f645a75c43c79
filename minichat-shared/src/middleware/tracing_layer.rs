use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn is_production() -> bool {
    std::env::var("MINICHAT_ENV")
        .map(|v| v == "production")
        .unwrap_or(false)
}

pub fn init_tracing(service_name: &str) {
    let crate_target = service_name.replace('-', "_");
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{crate_target}=debug,minichat_shared=debug,tower_http=debug")));

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: a second service in the same process (tests) keeps the first subscriber
    let result = if is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::info!(service = service_name, production = is_production(), "tracing initialized");
    }
}
