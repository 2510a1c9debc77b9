use std::convert::Infallible;
use std::sync::Arc;

use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use tick_http::handler::make_handler;
use tick_http::protocol::{Request, Response, Value};
use tick_http::server::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = ServerConfig::builder().host("127.0.0.1").port(8080).build();
    let handler = Arc::new(make_handler(hello));

    if let Err(e) = Server::new(config).run(handler).await {
        error!(cause = %e, "server failed to start");
    }
}

async fn hello(request: Request) -> Result<Response, Infallible> {
    let name = request.query().get("name").map(Value::first).unwrap_or("world");

    Ok(Response::builder()
        .header("Content-Type", "text/plain")
        .body(format!("Hello, {name}!\r\n"))
        .build())
}
