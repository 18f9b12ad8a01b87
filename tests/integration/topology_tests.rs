use notebook_chat::config::CellRoles;
use notebook_chat::document::{DocumentService, InMemoryDocument};
use notebook_chat::models::cell::CellData;
use notebook_chat::orchestrator::topology::{
    append_next_user_cell, ensure_response_cell, PlacementError,
};
use notebook_chat::AppError;

use super::test_helpers::languages;

#[tokio::test]
async fn last_cell_gets_new_assistant_cell() {
    let document = InMemoryDocument::with_cells(vec![CellData::code("user", "q")]);

    let slot = ensure_response_cell(&document, 0, &CellRoles::default())
        .await
        .expect("slot");

    assert_eq!(slot.index, 1);
    assert!(slot.was_last);
    assert!(slot.inserted);
    assert_eq!(languages(&document), vec!["user", "assistant"]);
}

#[tokio::test]
async fn existing_assistant_successor_is_reused() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "q"),
        CellData::code("assistant", "old answer"),
        CellData::code("user", "q2"),
    ]);

    let slot = ensure_response_cell(&document, 0, &CellRoles::default())
        .await
        .expect("slot");

    assert_eq!(slot.index, 1);
    assert!(!slot.was_last);
    assert!(!slot.inserted);
    assert_eq!(document.cell_count(), 3);
    assert_eq!(document.cell(1).map(|c| c.text), Some("old answer".to_owned()));
}

#[tokio::test]
async fn mistagged_successor_gets_new_cell_in_between() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "q"),
        CellData::code("python", "x = 1"),
    ]);

    let slot = ensure_response_cell(&document, 0, &CellRoles::default())
        .await
        .expect("slot");

    assert_eq!(slot.index, 1);
    assert!(!slot.was_last);
    assert!(slot.inserted);
    assert_eq!(languages(&document), vec!["user", "assistant", "python"]);
}

#[tokio::test]
async fn markup_successor_is_not_a_response_slot() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "q"),
        CellData::markup("notes"),
    ]);

    let slot = ensure_response_cell(&document, 0, &CellRoles::default())
        .await
        .expect("slot");

    assert!(slot.inserted);
    assert_eq!(document.cell_count(), 3);
}

#[tokio::test]
async fn custom_roles_are_honored() {
    let roles = CellRoles {
        user: "human".into(),
        assistant: "bot".into(),
    };
    let document = InMemoryDocument::with_cells(vec![CellData::code("human", "q")]);

    let slot = ensure_response_cell(&document, 0, &roles).await.expect("slot");
    let next = append_next_user_cell(&document, slot, &roles)
        .await
        .expect("next");

    assert_eq!(next, Some(2));
    assert_eq!(languages(&document), vec!["human", "bot", "human"]);
}

#[tokio::test]
async fn next_user_cell_only_after_last_cell() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "q"),
        CellData::code("user", "later"),
    ]);
    let roles = CellRoles::default();

    let slot = ensure_response_cell(&document, 0, &roles).await.expect("slot");
    let next = append_next_user_cell(&document, slot, &roles)
        .await
        .expect("next");

    assert_eq!(next, None);
    assert_eq!(languages(&document), vec!["user", "assistant", "user"]);
}

#[tokio::test]
async fn out_of_range_active_cell_is_not_found() {
    let document = InMemoryDocument::with_cells(vec![CellData::code("user", "q")]);

    let result = ensure_response_cell(&document, 4, &CellRoles::default()).await;

    assert!(matches!(
        result,
        Err(PlacementError {
            error: AppError::NotFound(_),
            stray_index: None
        })
    ));
}

#[tokio::test]
async fn rejected_insert_propagates() {
    let document = InMemoryDocument::with_cells(vec![CellData::code("user", "q")]);
    document.set_reject_commands(true);

    let result = ensure_response_cell(&document, 0, &CellRoles::default()).await;

    assert!(matches!(
        result,
        Err(PlacementError {
            error: AppError::Command(_),
            stray_index: None
        })
    ));
    assert_eq!(document.cell_count(), 1);
}

#[tokio::test]
async fn rejected_response_retag_reports_stray_cell() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "one"),
        CellData::code("user", "two"),
    ]);
    document.reject_next_language_changes(1);

    let err = ensure_response_cell(&document, 0, &CellRoles::default())
        .await
        .expect_err("retag rejected");

    assert!(matches!(err.error, AppError::Command(_)));
    assert_eq!(err.stray_index, Some(1));
    assert!(err.to_string().contains("untagged cell left at 1"));
    assert_eq!(languages(&document), vec!["user", "user", "user"]);
    assert_eq!(document.cell(1).map(|c| c.text), Some(String::new()));
    assert_eq!(document.cell(2).map(|c| c.text), Some("two".to_owned()));
}

#[tokio::test]
async fn rejected_user_retag_reports_stray_cell() {
    let document = InMemoryDocument::with_cells(vec![CellData::code("user", "q")]);
    let roles = CellRoles::default();
    let slot = ensure_response_cell(&document, 0, &roles).await.expect("slot");
    document.reject_next_language_changes(1);

    let err = append_next_user_cell(&document, slot, &roles)
        .await
        .expect_err("retag rejected");

    assert_eq!(err.stray_index, Some(2));
    assert_eq!(languages(&document), vec!["user", "assistant", "assistant"]);
}
