//! Categories.

use tracing::info;

use cage_core::{flags, Category, CategoryId};
use cage_events::EventKind;
use cage_perms::Actor;
use cage_store::{CategoryEntry, CategoryOrder, InsertResult, UpdateResult};

use crate::cms::Cms;
use crate::error::{ActionError, ActionResult};

fn missing_category(id: &CategoryId) -> ActionError {
    ActionError::not_found("id", format!("category {id} does not exist"))
}

fn blank_name() -> ActionError {
    ActionError::invalid("name", "please enter a valid category name")
}

impl Cms {
    pub async fn list_categories(
        &self,
        actor: &Actor,
        order: CategoryOrder,
        desc: bool,
    ) -> ActionResult<Vec<CategoryEntry>> {
        self.guard.require(actor, flags::READ_CATEGORY)?;
        Ok(self.store.list_categories(order, desc).await?)
    }

    pub async fn get_category(&self, actor: &Actor, id: &CategoryId) -> ActionResult<CategoryEntry> {
        self.guard.require(actor, flags::READ_CATEGORY)?;
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| missing_category(id))
    }

    pub async fn create_category(&self, actor: &Actor, id: &str, name: &str) -> ActionResult<CategoryEntry> {
        self.guard.require(actor, flags::CREATE_CATEGORY)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(blank_name());
        }
        self.rules.category_id.check("id", id)?;

        let category = Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            created_at: self.now(),
            created_by: actor.id.clone(),
        };
        match self.store.insert_category(&category).await? {
            InsertResult::Inserted => {}
            InsertResult::Duplicate { field: "id" } => {
                return Err(ActionError::duplicate("id", format!("category id {id} already exists")));
            }
            InsertResult::Duplicate { field } => {
                return Err(ActionError::duplicate(field, format!("category name {name} already exists")));
            }
        }

        info!(category = %category.id, "category created");
        self.notify(
            EventKind::CategoryCreate,
            &format!("category({id}) has been created."),
            actor,
        )
        .await;
        Ok(CategoryEntry {
            category,
            article_count: 0,
        })
    }

    /// Rename a category. Categories created by someone else need
    /// `EDIT_OTHERS_CATEGORY`.
    pub async fn edit_category(&self, actor: &Actor, id: &CategoryId, name: &str) -> ActionResult<CategoryEntry> {
        self.guard.require(actor, flags::EDIT_CATEGORY)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(blank_name());
        }
        let mut entry = self
            .store
            .get_category(id)
            .await?
            .ok_or_else(|| missing_category(id))?;
        self.guard.require_owner_or(
            actor,
            entry.category.created_by.as_ref(),
            flags::EDIT_OTHERS_CATEGORY,
        )?;

        match self.store.rename_category(id, name).await? {
            UpdateResult::Updated => {}
            UpdateResult::Duplicate { field } => {
                return Err(ActionError::duplicate(field, format!("category name {name} already exists")));
            }
            UpdateResult::NotFound => return Err(missing_category(id)),
        }

        let old_name = std::mem::replace(&mut entry.category.name, name.to_string());
        info!(category = %id, "category renamed");
        self.notify(
            EventKind::CategoryModify,
            &format!("category({id}) changed from `{old_name}` to `{name}`."),
            actor,
        )
        .await;
        Ok(entry)
    }

    /// Delete a category. Its articles keep existing without one.
    pub async fn delete_category(&self, actor: &Actor, id: &CategoryId) -> ActionResult<()> {
        self.guard.require(actor, flags::EDIT_CATEGORY)?;

        let entry = self
            .store
            .get_category(id)
            .await?
            .ok_or_else(|| missing_category(id))?;
        self.guard.require_owner_or(
            actor,
            entry.category.created_by.as_ref(),
            flags::EDIT_OTHERS_CATEGORY,
        )?;

        if !self.store.delete_category(id).await? {
            return Err(missing_category(id));
        }

        info!(category = %id, "category deleted");
        self.notify(
            EventKind::CategoryDelete,
            &format!("category({id}) has been deleted."),
            actor,
        )
        .await;
        Ok(())
    }
}
