use clap::Parser;
use llm_stream_core::mock_server;

/// Standalone scripted mock provider server, serving both the Chat
/// Completions and Responses SSE dialects on the same port.
#[derive(Parser)]
#[command(name = "mock-server")]
#[command(author, version, about = "Mock LLM streaming server for black-box testing", long_about = None)]
struct Cli {
    /// Port to bind. Defaults to an OS-assigned ephemeral port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let handle = match mock_server::spawn_on(cli.port.unwrap_or(0)).await {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("failed to start mock server: {}", err);
            std::process::exit(1);
        }
    };

    println!("mock server listening on {}", handle.base_url());
    println!("POST {}/v1/chat/completions  (Chat dialect)", handle.base_url());
    println!("POST {}/v1/responses         (Responses dialect)", handle.base_url());
    println!("POST {}/_mock/expect         (queue scripted responses)", handle.base_url());

    tokio::signal::ctrl_c().await.ok();
    llm_stream_core::log("mock server shutting down");
}
