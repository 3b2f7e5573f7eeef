use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = blog_server::config::from_env()?;
    let host = config.get("http.host").unwrap_or("0.0.0.0").to_string();
    let port = config.get("http.port").unwrap_or("3001").to_string();

    let (ax, stores) = blog_server::build(config).await?;

    let addr = format!("{host}:{port}");
    tracing::info!("blog API listening on http://{addr}");

    let served = ax.listen(addr).await;

    if let Err(e) = stores.shutdown().await {
        tracing::error!(error = %e, "failed to close the document store");
    }
    served
}
