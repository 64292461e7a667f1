use lsp_server::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

use text_language_server::server::TextLanguageServer;

fn main() -> anyhow::Result<()> {
    // Initialize logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("text_language_server=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("text-language-server v{} starting", env!("CARGO_PKG_VERSION"));

    let (connection, io_threads) = Connection::stdio();

    let server = TextLanguageServer::new(connection);
    server.run()?;

    io_threads.join()?;
    Ok(())
}
