use clap::Parser;
use freshservice_mcp::mcp_integration::http;
use freshservice_mcp::upstream::ReqwestTransport;
use freshservice_mcp::{AdapterConfig, Dispatcher, FreshserviceMcpServer};
use log::{error, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(version, about = "Freshservice tools over the Model Context Protocol")]
struct CliArgs {
    /// Address to listen on; overrides MCP_HOST.
    #[clap(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on; overrides MCP_PORT.
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Serve JSON-RPC over stdin/stdout instead of HTTP.
    #[clap(long)]
    pub stdio: bool,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(err) => {
            warn!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // stderr keeps stdout free for JSON-RPC in stdio mode
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli_args = CliArgs::parse();

    let config = match AdapterConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let transport = match ReqwestTransport::new() {
        Ok(transport) => transport,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let dispatcher = match Dispatcher::from_config(&config, transport) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            error!("Failed to build operation catalog: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let server = Arc::new(FreshserviceMcpServer::new(dispatcher));

    let outcome = if cli_args.stdio {
        tokio::select! {
            result = server.run_stdio() => result,
            _ = shutdown_signal() => Ok(()),
        }
    } else {
        let host = match cli_args.host {
            Some(host) => host,
            None => match config.listen_host.parse::<IpAddr>() {
                Ok(host) => host,
                Err(err) => {
                    error!("Invalid listen host '{}': {}", config.listen_host, err);
                    return ExitCode::FAILURE;
                }
            },
        };
        let addr = SocketAddr::new(host, cli_args.port.unwrap_or(config.listen_port));
        http::serve(server, addr, shutdown_signal()).await
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Server error: {}", err);
            ExitCode::FAILURE
        }
    }
}
