use std::net::SocketAddr;
use std::sync::Arc;

use harborcrm_api::app::services::AppServices;
use harborcrm_infra::{LogMailer, MailDispatcher, UnconfiguredMailer};

#[tokio::main]
async fn main() {
    harborcrm_observability::init();

    let secret = std::env::var("AUTH_TOKEN_SECRET").unwrap_or_else(|_| {
        tracing::warn!("AUTH_TOKEN_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let mailer: Arc<dyn MailDispatcher> = match std::env::var("MAIL_MODE").as_deref() {
        Ok("log") => Arc::new(LogMailer),
        _ => Arc::new(UnconfiguredMailer),
    };

    let services = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url)
                .await
                .expect("failed to connect to Postgres");
            Arc::new(AppServices::postgres(pool, &secret, mailer))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Arc::new(AppServices::in_memory_with_mailer(&secret, mailer))
        }
    };

    // First-run bootstrap: accounts are otherwise only created by admins.
    if let (Ok(email), Ok(password)) = (
        std::env::var("BOOTSTRAP_ADMIN_EMAIL"),
        std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
    ) {
        if let Err(e) = services.bootstrap_admin(&email, &password).await {
            tracing::error!(error = %e, "bootstrap admin creation failed");
        }
    }

    let app = harborcrm_api::app::build_app(services).await;

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
