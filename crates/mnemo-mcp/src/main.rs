//! Mnemo MCP Server — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::json;

use mnemo_mcp::config::resolve_listen_addr;
use mnemo_mcp::context::make_server_context;
use mnemo_mcp::methods;
use mnemo_mcp::protocol::server::READY_METHOD;
use mnemo_mcp::protocol::{serve_tcp, ProtocolServer};
use mnemo_mcp::transport::{MemoryTransport, StdioTransport};
use mnemo_mcp::types::{InitializeResult, ServerIdentity};

#[derive(Parser)]
#[command(
    name = "mnemo-mcp",
    about = "Mnemo MCP server — project memory for AI agents over JSON-RPC",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server over stdio (default).
    Serve,

    /// Start the server over TCP, one session per connection.
    ServeTcp {
        /// Listen address (host:port). Also reads MNEMO_ADDR.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Print server identity and registered methods as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   mnemo-mcp completions bash > ~/.local/share/bash-completion/completions/mnemo-mcp
    ///   mnemo-mcp completions zsh > ~/.zfunc/_mnemo-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let ctx = Arc::new(make_server_context(client_info()).await?);
            let mut server = ProtocolServer::new(StdioTransport::new(), ServerIdentity::default());
            methods::register_all(&mut server, ctx);
            server.start().await?;
            server.notify(READY_METHOD, Some(json!({}))).await?;
            server.run().await?;
        }

        Commands::ServeTcp { addr } => {
            let addr = resolve_listen_addr(addr.as_deref());
            let ctx = Arc::new(make_server_context(client_info()).await?);
            serve_tcp(&addr, ServerIdentity::default(), move |server| {
                methods::register_all(server, Arc::clone(&ctx));
            })
            .await?;
        }

        Commands::Info => {
            let ctx = Arc::new(make_server_context(client_info()).await?);
            let identity = ServerIdentity::default();
            let handshake = InitializeResult::for_identity(&identity);
            let (transport, _client) = MemoryTransport::pair();
            let mut server = ProtocolServer::new(transport, identity);
            methods::register_all(&mut server, ctx);
            let info = json!({
                "server": handshake.server_info,
                "protocol_version": handshake.protocol_version,
                "capabilities": handshake.capabilities,
                "methods": server.registry().method_names(),
                "method_count": server.registry().len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mnemo-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn client_info() -> mnemo::ClientInfo {
    mnemo::ClientInfo {
        name: "mnemo-mcp".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}