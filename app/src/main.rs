#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    easel_app::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = easel_app::run(&args).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
