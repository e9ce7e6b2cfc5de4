//! Book categories.

use storage::{Category, CategoryId, Store, StoreError};

use crate::error::{DomainError, Result};

/// Canonical form of a category name: trimmed and lower-cased.
pub fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(DomainError::invalid("category name must not be blank"));
    }
    Ok(name)
}

/// Service for categories.
pub struct CategoryService<S: Store> {
    store: S,
}

impl<S: Store> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let name = normalize_name(name)?;
        if self.store.category_name_taken(&name).await? {
            return Err(DomainError::conflict(format!(
                "category '{name}' already exists"
            )));
        }
        let category = self.store.create_category(&name).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or(DomainError::NotFound("category"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// Renames a category. Keeping the current name is not a conflict.
    #[tracing::instrument(skip(self))]
    pub async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let existing = self.get_category(id).await?;
        let name = normalize_name(name)?;
        if name != existing.name && self.store.category_name_taken(&name).await? {
            return Err(DomainError::conflict(format!(
                "category '{name}' already exists"
            )));
        }
        let category = Category { id, name };
        self.store.update_category(&category).await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        if !self.store.category_exists(id).await? {
            return Err(DomainError::NotFound("category"));
        }
        self.store.delete_category(id).await.map_err(|e| match e {
            StoreError::Conflict(_) => DomainError::conflict("category still has books"),
            other => other.into(),
        })?;
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_lowercased() {
        assert_eq!(normalize_name("  Science Fiction ").unwrap(), "science fiction");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(matches!(
            normalize_name("   "),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
