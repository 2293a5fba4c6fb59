/// The API crate exposes the synthesis pipeline over HTTP
use std::net::SocketAddr;
use std::sync::Arc;

use synth_core::config::ApiConfig;
use synth_core::{Error, Result};
use synth_pipeline::ContractPipeline;
use tokio::net::TcpListener;
use tracing::info;

pub mod http;

pub use http::{router, ApiState};

/// API server
pub struct ApiServer {
    pipeline: Arc<ContractPipeline>,
    addr: SocketAddr,
    cors_enabled: bool,
}

impl ApiServer {
    pub fn new(pipeline: Arc<ContractPipeline>, addr: SocketAddr, cors_enabled: bool) -> Self {
        Self {
            pipeline,
            addr,
            cors_enabled,
        }
    }

    /// Create a new API server from an API config
    pub fn from_config(config: &ApiConfig, pipeline: Arc<ContractPipeline>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;

        Ok(Self::new(pipeline, addr, config.cors_enabled))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| Error::Io(format!("Failed to bind to {}: {}", self.addr, e)))?;

        let app = router(ApiState::new(self.pipeline), self.cors_enabled);
        info!("API server listening on {}", self.addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Io(format!("Server error: {}", e)))?;

        Ok(())
    }
}
