mod cli;
mod infra;
mod quote;
mod routes;
mod server;

use solar_finance::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
