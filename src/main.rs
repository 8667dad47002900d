mod cli;

#[tokio::main]
async fn main() {
    let config = match cli::run() {
        cli::RunOutcome::Serve(config) => config,
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    if let Err(err) = pushfan::serve(config).await {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}
