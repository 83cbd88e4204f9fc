use mock_server::Fixture;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8123".to_string());
    let fixture = match std::env::var("FIXTURE") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Fixture::from_json(&raw).map_err(std::io::Error::other)?
        }
        Err(_) => Fixture::default(),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}");
    mock_server::run(listener, mock_server::db(fixture)).await
}
