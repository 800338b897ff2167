mod health;

use std::net::SocketAddr;

use axum::Router;
use duet_config::Config;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the HTTP application from configuration
    ///
    /// Jobs started by the server are cancelled when `shutdown` fires.
    pub async fn new(config: Config, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let dialogue_state = dialogue::build_state(&config, shutdown).await?;

        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        app = app.merge(dialogue::endpoint_router().with_state(dialogue_state));

        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
