//! Exchange voucher service server binary

use clap::Parser;

use exvo_api::{run_server, ApiConfig};

#[derive(Parser)]
#[command(name = "exvo")]
#[command(about = "Exchange voucher service API server")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// HMAC secret for scan-payload signing
    #[arg(long, env = "EXVO_SECRET", default_value = "insecure-dev-secret")]
    secret: String,

    /// Base URL embedded in generated mobile access links
    #[arg(long, env = "EXVO_BASE_URL")]
    base_url: Option<String>,

    /// Default validity of access links, in hours
    #[arg(long, default_value = "72")]
    link_hours: u32,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    if args.secret == "insecure-dev-secret" {
        tracing::warn!("Running with the default payload secret; set EXVO_SECRET in production");
    }

    let config = ApiConfig {
        base_url: args
            .base_url
            .unwrap_or_else(|| format!("http://{}:{}", args.host, args.port)),
        host: args.host,
        port: args.port,
        enable_cors: !args.no_cors,
        payload_secret: args.secret,
        default_link_hours: args.link_hours,
    };

    run_server(&config).await
}
