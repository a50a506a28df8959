use clap::Parser;
use clap::error::ErrorKind;
use matchbook::api;
use matchbook::queue::INTAKE_CAPACITY;
use matchbook::state::AppState;
use matchbook::utils::shutdown_token;
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "matchbook")]
#[command(
    version = "0.1",
    about = "A single-instrument limit order book with an asynchronous matching engine"
)]
struct Cli {
    /// Address to bind the service on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 50051, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // clap's own exit code for bad arguments is 2; this service promises 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup tracing
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = AppState::new();
    let token = shutdown_token();
    let app = api::router(state.clone());

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, intake_capacity = INTAKE_CAPACITY, "order book service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;

    // the listener is down; let the matcher finish its in-flight order
    let _ = state.engine.shutdown();
    tracing::info!("shutdown complete");
    Ok(())
}
