pub mod format;
pub mod handlers;
pub mod jsonrpc;
pub mod session;
pub mod tools;
pub mod transport;

use tokio::io::BufReader;

use crate::calendar::CalendarService;

/// Serve MCP over stdin/stdout until the client exits or closes stdin.
pub async fn serve_stdio(service: &CalendarService) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    tracing::info!("MCP server listening on stdio");
    transport::serve(service, stdin, stdout).await
}
