use recpush::config::Config;

#[tokio::main]
async fn main() {
    let config_path = Config::path_from_env();
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("recpush: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = recpush::init_logging(&config) {
        eprintln!("recpush: {e}");
        std::process::exit(1);
    }

    if let Err(e) = recpush::run(config).await {
        tracing::error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}
