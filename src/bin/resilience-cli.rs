use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "resilience-cli")]
#[command(about = "Inspect health, circuit breakers and cache of a running tracker-resilience", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "RESILIENCE_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full health report
    Health,
    /// Readiness of critical dependencies
    Ready,
    /// Service status
    Status,
    /// Circuit breaker snapshots
    Breakers,
    /// Force every circuit breaker closed
    Reset,
    /// Cache statistics and TTL policy
    Cache,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)),
        Commands::Ready => client.get(format!("{}/health/ready", cli.url)),
        Commands::Status => client.get(format!("{}/admin/status", cli.url)).headers(headers),
        Commands::Breakers => client
            .get(format!("{}/admin/circuit-breakers", cli.url))
            .headers(headers),
        Commands::Reset => client
            .post(format!("{}/admin/circuit-breakers/reset", cli.url))
            .headers(headers),
        Commands::Cache => client.get(format!("{}/admin/cache", cli.url)).headers(headers),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Health endpoints answer 503 with a full report body.
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if !text.is_empty() => println!("{}", text),
        Err(_) => {}
    }

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        std::process::exit(1);
    }
    Ok(())
}
