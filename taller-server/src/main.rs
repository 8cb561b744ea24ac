use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ax = taller_server::build().await?;

    let host = ax
        .app()
        .get("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());

    let port = ax
        .app()
        .get("http.port")
        .unwrap_or_else(|| "3030".to_string());

    ax.listen(format!("{host}:{port}")).await?;

    Ok(())
}
