// tests/category_tests.rs

mod common;

use common::{add_category, add_text_question, spawn_app};
use exam_bank::{
    error::AppError,
    models::category::{CreateCategoryRequest, ROOT_PARENT_ID, UpdateCategoryRequest},
};

#[tokio::test]
async fn tree_counts_roll_up_three_levels() {
    // Arrange
    let app = spawn_app();
    let root = add_category(&app, "Architecture", ROOT_PARENT_ID).await;
    let timber = add_category(&app, "Timber", root.id).await;
    let masonry = add_category(&app, "Masonry", root.id).await;
    let halls = add_category(&app, "Halls", timber.id).await;
    let pagodas = add_category(&app, "Pagodas", timber.id).await;
    let bridges = add_category(&app, "Bridges", masonry.id).await;

    for (category_id, count) in [(halls.id, 2), (pagodas.id, 3), (bridges.id, 5)] {
        for i in 0..count {
            add_text_question(&app, &format!("q-{}-{}", category_id, i), category_id).await;
        }
    }

    // Act
    let tree = app.state.categories.build_tree().await.unwrap();

    // Assert
    assert_eq!(tree.len(), 1);
    let root_node = &tree[0];
    assert_eq!(root_node.id, root.id);
    assert_eq!(root_node.count, 10);

    let timber_node = root_node.children.iter().find(|c| c.id == timber.id).unwrap();
    assert_eq!(timber_node.count, 5);
    assert_eq!(timber_node.children.len(), 2);
    let masonry_node = root_node.children.iter().find(|c| c.id == masonry.id).unwrap();
    assert_eq!(masonry_node.count, 5);
}

#[tokio::test]
async fn flat_list_carries_own_counts_in_sort_order() {
    // Arrange
    let app = spawn_app();
    let second = app
        .state
        .categories
        .add_category(CreateCategoryRequest { name: "Second".into(), parent_id: 0, sort: 2 })
        .await
        .unwrap();
    let first = app
        .state
        .categories
        .add_category(CreateCategoryRequest { name: "First".into(), parent_id: 0, sort: 1 })
        .await
        .unwrap();
    let child = add_category(&app, "Child", first.id).await;
    add_text_question(&app, "own question", child.id).await;

    // Act
    let flat = app.state.categories.list_flat().await.unwrap();

    // Assert
    assert_eq!(flat.len(), 3);
    let order: Vec<i64> = flat.iter().map(|c| c.id).collect();
    assert_eq!(order, vec![child.id, first.id, second.id]);
    let first_flat = flat.iter().find(|c| c.id == first.id).unwrap();
    assert_eq!(first_flat.count, 0, "flat listing must not roll up");
    assert_eq!(flat.iter().find(|c| c.id == child.id).unwrap().count, 1);
}

#[tokio::test]
async fn duplicate_sibling_name_is_rejected() {
    // Arrange
    let app = spawn_app();
    let parent_one = add_category(&app, "History", ROOT_PARENT_ID).await;
    let parent_two = add_category(&app, "Structure", ROOT_PARENT_ID).await;
    add_category(&app, "Basics", parent_one.id).await;

    // Act
    let duplicate = app
        .state
        .categories
        .add_category(CreateCategoryRequest {
            name: "Basics".to_string(),
            parent_id: parent_one.id,
            sort: 0,
        })
        .await;
    let other_parent = app
        .state
        .categories
        .add_category(CreateCategoryRequest {
            name: "Basics".to_string(),
            parent_id: parent_two.id,
            sort: 0,
        })
        .await;

    // Assert
    match duplicate {
        Err(AppError::DuplicateName(msg)) => {
            assert!(msg.contains("History"), "message should name the parent: {}", msg);
            assert!(msg.contains("Basics"), "message should name the child: {}", msg);
        }
        other => panic!("expected DuplicateName, got {:?}", other),
    }
    assert!(other_parent.is_ok());
}

#[tokio::test]
async fn rename_checks_siblings_but_not_itself() {
    // Arrange
    let app = spawn_app();
    let root = add_category(&app, "Root", ROOT_PARENT_ID).await;
    let a = add_category(&app, "Alpha", root.id).await;
    add_category(&app, "Beta", root.id).await;

    // Act
    let collide = app
        .state
        .categories
        .update_category(a.id, UpdateCategoryRequest { name: "Beta".into(), sort: None })
        .await;
    let keep_name = app
        .state
        .categories
        .update_category(a.id, UpdateCategoryRequest { name: "Alpha".into(), sort: Some(7) })
        .await;
    let missing = app
        .state
        .categories
        .update_category(9999, UpdateCategoryRequest { name: "Gamma".into(), sort: None })
        .await;

    // Assert
    assert!(matches!(collide, Err(AppError::DuplicateName(_))));
    assert!(keep_name.is_ok());
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    let flat = app.state.categories.list_flat().await.unwrap();
    assert_eq!(flat.iter().find(|c| c.id == a.id).unwrap().sort, 7);
}

#[tokio::test]
async fn add_under_missing_parent_fails() {
    let app = spawn_app();

    let result = app
        .state
        .categories
        .add_category(CreateCategoryRequest { name: "Orphan".into(), parent_id: 404, sort: 0 })
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_guards() {
    // Arrange
    let app = spawn_app();
    let root = add_category(&app, "Root", ROOT_PARENT_ID).await;
    let used = add_category(&app, "Used", root.id).await;
    let parent = add_category(&app, "Parent", root.id).await;
    add_category(&app, "Leaf", parent.id).await;
    let empty = add_category(&app, "Empty", root.id).await;
    add_text_question(&app, "first", used.id).await;
    add_text_question(&app, "second", used.id).await;

    // Act + Assert: root
    let err = app.state.categories.delete_category(root.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidOperation(_)));

    // Still referenced by questions
    match app.state.categories.delete_category(used.id).await {
        Err(AppError::ReferencedEntity { message, count }) => {
            assert_eq!(count, 2);
            assert!(message.contains('2'));
            assert!(message.contains("Used"));
        }
        other => panic!("expected ReferencedEntity, got {:?}", other),
    }

    // Still has children
    match app.state.categories.delete_category(parent.id).await {
        Err(AppError::ReferencedEntity { count, .. }) => assert_eq!(count, 1),
        other => panic!("expected ReferencedEntity, got {:?}", other),
    }

    // Free to go
    app.state.categories.delete_category(empty.id).await.unwrap();
    let err = app.state.categories.delete_category(empty.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn blank_name_fails_validation() {
    let app = spawn_app();

    let result = app
        .state
        .categories
        .add_category(CreateCategoryRequest { name: String::new(), parent_id: 0, sort: 0 })
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}
