use std::{net::SocketAddr, path::PathBuf};

use pscr::{
    api::{ApiState, router},
    config::DEFAULT_SNAPSHOT,
};

#[derive(clap::Parser)]
#[command(name = "student-api", about = "Read-only HTTP API over the latest student snapshot")]
struct Args {
    #[arg(long, env = "API_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,
    /// JSON document with a `students` object keyed by student id.
    #[arg(long, value_name = "file", env = "SNAPSHOT_PATH", default_value = DEFAULT_SNAPSHOT)]
    snapshot: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;
    use tokio::net::TcpListener;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let app = router(ApiState::new(args.snapshot));

    let listener = TcpListener::bind(args.bind).await?;
    tracing::info!(target: "api", "listening on \x1b[1;36mhttp://{}\x1b[0m", args.bind);

    axum::serve(listener, app).await.map_err(Into::into)
}
