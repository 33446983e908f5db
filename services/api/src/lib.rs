mod cli;
mod demo;
mod email;
mod infra;
mod routes;
mod server;

use jeanbrun::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
