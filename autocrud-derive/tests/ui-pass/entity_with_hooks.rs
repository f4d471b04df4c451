//! Hooks listed on the struct are exposed through Lifecycle

use async_trait::async_trait;
use autocrud::hooks::{AfterDelete, BeforeCreate, Lifecycle};
use autocrud::{BoxError, Context, Entity, StorageDriver};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Entity)]
#[crud(hooks(before_create, AfterDelete))]
pub struct Note {
    #[crud("pk")]
    pub id: uuid::Uuid,
    pub title: String,
}

#[async_trait]
impl BeforeCreate for Note {
    async fn before_create(&mut self, _ctx: &Context, _tx: &dyn StorageDriver) -> Result<(), BoxError> {
        self.title = self.title.trim().to_string();
        Ok(())
    }
}

#[async_trait]
impl AfterDelete for Note {
    async fn after_delete(&mut self, _ctx: &Context, _tx: &dyn StorageDriver) -> Result<(), BoxError> {
        Ok(())
    }
}

fn main() {
    let mut note = Note::default();
    assert!(note.before_create_hook().is_some());
    assert!(note.after_delete_hook().is_some());
    assert!(note.after_create_hook().is_none());
    assert!(note.before_update_hook().is_none());
}
