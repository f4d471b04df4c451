//! Lifecycle hooks over the in-memory driver
//!
//! ```bash
//! cargo run --example lifecycle_hooks
//! ```
//!
//! `POST /article` trims the title and stamps a slug; deleting a published
//! article is refused by its `before_delete` hook.

use async_trait::async_trait;
use autocrud::hooks::{BeforeCreate, BeforeDelete};
use autocrud::{App, AppConfig, BoxError, Context, Entity, MemoryDriver, StorageDriver};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Entity)]
#[crud(hooks(before_create, before_delete))]
pub struct Article {
    #[crud("pk")]
    pub id: i64,
    pub title: String,
    #[crud("readonly")]
    pub slug: String,
    pub published: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("published articles cannot be deleted")]
struct Published;

#[async_trait]
impl BeforeCreate for Article {
    async fn before_create(&mut self, _ctx: &Context, _tx: &dyn StorageDriver) -> Result<(), BoxError> {
        self.title = self.title.trim().to_string();
        self.slug = self.title.to_lowercase().replace(' ', "-");
        Ok(())
    }
}

#[async_trait]
impl BeforeDelete for Article {
    async fn before_delete(&mut self, _ctx: &Context, _tx: &dyn StorageDriver) -> Result<(), BoxError> {
        if self.published {
            return Err(Published.into());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let mut app = App::builder()
        .config(AppConfig::from_env()?)
        .storage(MemoryDriver::new())
        .build();
    app.register::<Article>()?;
    app.serve().await?;
    Ok(())
}
