//! Report Service - client and server in one process.
//!
//! This example demonstrates:
//! - Registering parameter descriptors under shared ids
//! - Binding overloads of one method, distinguished by parameter type
//! - A typed client stub whose arguments are updated in place by the server
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=debug cargo run --example report_service
//! ```

use std::sync::Arc;

use rpcwire::{ClientBuilder, ParamRegistry, RpcClient, RpcConfig, ServerBuilder, ServiceTable};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Parameter-type ids shared by client and server.
mod param_type {
    pub const REGISTER_DATA: i32 = 1;
    pub const LOGIN_DATA: i32 = 2;
}

const REPORT_SERVICE: &str = "ReportService";

/// A new player registration.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct RegisterData {
    puid: String,
    device: String,
    player_id: i32,
    time: String,
}

/// A player login.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct LoginData {
    puid: String,
    device: String,
    player_id: i32,
    period: i32,
    time: String,
}

fn registry() -> rpcwire::Result<ParamRegistry> {
    let mut registry = ParamRegistry::new();
    registry.register_record::<RegisterData>(param_type::REGISTER_DATA, "register-data")?;
    registry.register_record::<LoginData>(param_type::LOGIN_DATA, "login-data")?;
    Ok(registry)
}

fn services() -> ServiceTable {
    let mut services = ServiceTable::new();
    services
        .bind_record(
            REPORT_SERVICE,
            "report",
            param_type::REGISTER_DATA,
            |data: &mut RegisterData| {
                tracing::info!("Register from {} on {}", data.puid, data.device);
                // The server assigns the player id.
                data.player_id = 1000 + data.puid.len() as i32;
                Ok(())
            },
        )
        .bind_record(
            REPORT_SERVICE,
            "report",
            param_type::LOGIN_DATA,
            |data: &mut LoginData| {
                tracing::info!("Login of player {}", data.player_id);
                data.period += 1;
                Ok(())
            },
        );
    services
}

/// Typed stub for the report service.
struct ReportServiceStub {
    client: Arc<RpcClient>,
}

impl ReportServiceStub {
    async fn report_register(&self, data: &mut RegisterData) -> rpcwire::Result<()> {
        self.client
            .invoke(REPORT_SERVICE, "report", param_type::REGISTER_DATA, &mut [data])
            .await
            .map(|_| ())
    }

    async fn report_login(&self, data: &mut LoginData) -> rpcwire::Result<()> {
        self.client
            .invoke(REPORT_SERVICE, "report", param_type::LOGIN_DATA, &mut [data])
            .await
            .map(|_| ())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rpcwire=info".parse()?))
        .init();

    let config = RpcConfig::load()?;

    let server = ServerBuilder::from_config(&config.server)
        .listen_port(0)
        .registry(registry()?)
        .services(services())
        .bind()
        .await?;
    let port = server.local_addr()?.port();
    tokio::spawn(server.run());

    let client = ClientBuilder::from_config(&config.client)
        .port(port)
        .registry(Arc::new(registry()?))
        .build();
    client.connect().await?;
    let stub = ReportServiceStub {
        client: Arc::new(client),
    };

    let mut register = RegisterData {
        puid: "puid-42".into(),
        device: "android".into(),
        player_id: 0,
        time: "2015-08-24 17:34:44".into(),
    };
    stub.report_register(&mut register).await?;
    tracing::info!("Assigned player id {}", register.player_id);

    let mut login = LoginData {
        puid: register.puid.clone(),
        device: register.device.clone(),
        player_id: register.player_id,
        period: 0,
        time: "2015-08-24 17:40:00".into(),
    };
    stub.report_login(&mut login).await?;
    tracing::info!("Login period now {}", login.period);

    let stats = stub.client.stats();
    tracing::info!(
        "Sent {} frames ({} bytes), received {} frames ({} bytes)",
        stats.frames_sent(),
        stats.bytes_sent(),
        stats.frames_received(),
        stats.bytes_received()
    );

    stub.client.close().await?;
    Ok(())
}
