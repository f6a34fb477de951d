#[tokio::main]
async fn main() {
    if let Err(e) = hms_lib::run().await {
        eprintln!("hospital-desk: {e}");
        std::process::exit(1);
    }
}
