use motocredito_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error de la aplicación: {err}");
        std::process::exit(1);
    }
}
