use crate::commands::Out;
use crate::{web, Config, Result};
use std::net::SocketAddr;

/// Runs the web application on `bind`. Only returns when the server stops.
pub async fn serve(config: Config, bind: SocketAddr) -> Result<Out<()>> {
    web::serve(config, bind).await?;
    Ok("The web server has stopped".into())
}
