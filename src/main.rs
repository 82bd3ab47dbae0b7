use console::style;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = cdis_client::app::run().await {
        eprintln!("{} {e:#}", style("Error:").red().bold());
        process::exit(1);
    }
}
