//! Minimal CRUD API over SQLite
//!
//! ```bash
//! cargo run --example minimal
//! ```
//!
//! Then visit <http://localhost:8080/todo>

use autocrud::{App, AppConfig, Entity, SeaOrmDriver};
use sea_orm::{ConnectionTrait, Statement};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Serialize, Deserialize, Entity)]
pub struct Todo {
    #[crud("pk")]
    pub id: i64,
    pub title: String,
    pub completed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    let mut config = AppConfig::from_env()?;
    let url = config
        .database_url
        .take()
        .unwrap_or_else(|| "sqlite::memory:".to_string());
    let driver = SeaOrmDriver::connect(&url).await?;

    driver
        .connection()
        .execute(Statement::from_string(
            driver.connection().get_database_backend(),
            r"CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                completed BOOLEAN NOT NULL
            );"
            .to_owned(),
        ))
        .await?;

    let mut app = App::builder().config(config).storage(driver).build();
    app.register::<Todo>()?;
    println!("{}", app.openapi().to_pretty_json()?);
    app.serve().await?;
    Ok(())
}
