use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = fieldtrack_lib::cli::Cli::parse();
    if let Err(err) = fieldtrack_lib::run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
