// src/services/category.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppError,
    models::category::{Category, CreateCategoryRequest, ROOT_PARENT_ID, UpdateCategoryRequest},
    store::Store,
};

/// Category listing, tree assembly and guarded category edits.
#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All categories ordered by `sort`, each with its own question count.
    pub async fn list_flat(&self) -> Result<Vec<Category>, AppError> {
        let mut categories = self.store.list_categories().await?;
        let counts = self.store.question_counts_by_category().await?;
        assign_own_counts(&mut categories, &counts);
        Ok(categories)
    }

    /// Root categories with nested children; each `count` covers the whole subtree.
    /// Costs one category query and one count query regardless of depth.
    pub async fn build_tree(&self) -> Result<Vec<Category>, AppError> {
        let flat = self.list_flat().await?;
        let tree = assemble_tree(flat);
        tracing::debug!("Built category tree with {} roots", tree.len());
        Ok(tree)
    }

    pub async fn add_category(&self, req: CreateCategoryRequest) -> Result<Category, AppError> {
        req.validate()?;
        let name = req.name.trim();

        let parent_label = self.parent_label(req.parent_id).await?;
        if self.store.category_name_taken(req.parent_id, name, None).await? {
            return Err(AppError::DuplicateName(format!(
                "under category {}, a child named '{}' already exists",
                parent_label, name
            )));
        }

        let category = self.store.insert_category(req.parent_id, name, req.sort).await?;
        tracing::info!("Created category '{}' (#{}) under {}", category.name, category.id, parent_label);
        Ok(category)
    }

    /// Renames / reorders a category. The parent cannot change here.
    pub async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> Result<(), AppError> {
        req.validate()?;
        let name = req.name.trim();

        let existing = self
            .store
            .find_category(id)
            .await?
            .ok_or_else(|| AppError::not_found("category", id))?;

        if self
            .store
            .category_name_taken(existing.parent_id, name, Some(id))
            .await?
        {
            let parent_label = self.parent_label(existing.parent_id).await?;
            return Err(AppError::DuplicateName(format!(
                "under category {}, a child named '{}' already exists",
                parent_label, name
            )));
        }

        let sort = req.sort.unwrap_or(existing.sort);
        if !self.store.update_category(id, name, sort).await? {
            return Err(AppError::not_found("category", id));
        }
        Ok(())
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        let category = self
            .store
            .find_category(id)
            .await?
            .ok_or_else(|| AppError::not_found("category", id))?;

        if category.is_root() {
            return Err(AppError::InvalidOperation(format!(
                "category '{}' is a root category and cannot be deleted",
                category.name
            )));
        }

        let question_count = self.store.count_questions_in_category(id).await?;
        if question_count > 0 {
            return Err(AppError::ReferencedEntity {
                message: format!(
                    "category '{}' is still referenced by {} questions",
                    category.name, question_count
                ),
                count: question_count,
            });
        }

        let child_count = self.store.count_child_categories(id).await?;
        if child_count > 0 {
            return Err(AppError::ReferencedEntity {
                message: format!(
                    "category '{}' still has {} sub-categories",
                    category.name, child_count
                ),
                count: child_count,
            });
        }

        self.store.delete_category(id).await?;
        tracing::info!("Deleted category '{}' (#{})", category.name, id);
        Ok(())
    }

    /// Human-readable name of a parent for error messages.
    async fn parent_label(&self, parent_id: i64) -> Result<String, AppError> {
        if parent_id == ROOT_PARENT_ID {
            return Ok("'<top level>'".to_string());
        }
        let parent = self
            .store
            .find_category(parent_id)
            .await?
            .ok_or_else(|| AppError::not_found("parent category", parent_id))?;
        Ok(format!("'{}'", parent.name))
    }
}

fn assign_own_counts(categories: &mut [Category], counts: &HashMap<i64, i64>) {
    for category in categories.iter_mut() {
        category.count = counts.get(&category.id).copied().unwrap_or(0);
    }
}

/// Turns a flat list (own counts set, sibling order = list order) into root
/// nodes with nested children and subtree counts.
///
/// Nodes are addressed by index into the flat list; children are looked up
/// through a parent-id index, so no node ever points back to its parent.
/// Nodes unreachable from a root, and edges that would close a cycle, are dropped.
pub fn assemble_tree(flat: Vec<Category>) -> Vec<Category> {
    let mut children_of: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, category) in flat.iter().enumerate() {
        children_of.entry(category.parent_id).or_default().push(idx);
    }

    let mut on_path = HashSet::new();
    children_of
        .get(&ROOT_PARENT_ID)
        .map(|roots| {
            roots
                .iter()
                .map(|&idx| build_node(idx, &flat, &children_of, &mut on_path))
                .collect()
        })
        .unwrap_or_default()
}

fn build_node(
    idx: usize,
    flat: &[Category],
    children_of: &HashMap<i64, Vec<usize>>,
    on_path: &mut HashSet<i64>,
) -> Category {
    let mut node = flat[idx].clone();
    on_path.insert(node.id);

    let mut children = Vec::new();
    if let Some(kids) = children_of.get(&node.id) {
        for &kid in kids {
            if on_path.contains(&flat[kid].id) {
                continue;
            }
            children.push(build_node(kid, flat, children_of, on_path));
        }
    }

    on_path.remove(&node.id);
    node.count += children.iter().map(|c| c.count).sum::<i64>();
    node.children = children;
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: i64, parent_id: i64, own: i64) -> Category {
        Category {
            id,
            name: format!("c{}", id),
            parent_id,
            sort: 0,
            created_at: None,
            count: own,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_three_level_rollup() {
        // 1 -> 2 -> {4 (2), 5 (3)}, 1 -> 3 -> 6 (5)
        let flat = vec![
            cat(1, 0, 0),
            cat(2, 1, 0),
            cat(3, 1, 0),
            cat(4, 2, 2),
            cat(5, 2, 3),
            cat(6, 3, 5),
        ];

        let tree = assemble_tree(flat);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].count, 10);
        assert_eq!(tree[0].children[0].count, 5);
        assert_eq!(tree[0].children[1].count, 5);
        assert_eq!(tree[0].children[0].children.len(), 2);
    }

    #[test]
    fn test_parent_listed_after_child_still_rolls_up() {
        let flat = vec![cat(3, 2, 4), cat(2, 1, 1), cat(1, 0, 0)];
        let tree = assemble_tree(flat);
        assert_eq!(tree[0].count, 5);
    }

    #[test]
    fn test_cycle_is_not_followed() {
        // 2 and 3 point at each other; neither is reachable from a root.
        let flat = vec![cat(1, 0, 1), cat(2, 3, 1), cat(3, 2, 1)];
        let tree = assemble_tree(flat);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].count, 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_own_counts_default_to_zero() {
        let mut categories = vec![cat(1, 0, 99), cat(2, 1, 99)];
        let counts = HashMap::from([(2, 7)]);
        assign_own_counts(&mut categories, &counts);
        assert_eq!(categories[0].count, 0);
        assert_eq!(categories[1].count, 7);
    }
}
