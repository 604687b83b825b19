#[tokio::main]
async fn main() {
    let code = finewatch::app::startup::startup().await;
    std::process::exit(code);
}
