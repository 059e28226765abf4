//! Sends two requests over one keep-alive connection.
//!
//! ```text
//! cargo run --example get -- 127.0.0.1:8080
//! ```

use std::error::Error;

use bytes::Bytes;
use http::Request;
use http_body_util::{BodyExt, Empty};
use micro_client::connection::ClientConn;
use tokio::net::TcpStream;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8080".to_owned());

    info!(%addr, "connecting");
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(cause = %e, "connect error");
            return Err(e.into());
        }
    };
    let conn = ClientConn::new(stream);

    for path in ["/", "/again"] {
        let request = Request::get(format!("http://{addr}{path}")).body(Empty::<Bytes>::new())?;
        let response = conn.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        info!(path, %status, len = body.len(), "received response");
    }

    conn.close().await?;
    Ok(())
}
