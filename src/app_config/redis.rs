use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::Client;

pub const DEFAULT_REDIS_HOST: &str = "redis://127.0.0.1/";

pub fn redis_client_for(url: &str) -> Result<Client> {
    Ok(Client::open(url)?)
}

/// 建立多路复用异步连接
pub async fn multiplexed_connection(client: &Client) -> Result<MultiplexedConnection> {
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(conn)
}
