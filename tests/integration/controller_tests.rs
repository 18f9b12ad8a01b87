use std::sync::Arc;
use std::time::Duration;

use notebook_chat::document::{DocumentService, InMemoryDocument};
use notebook_chat::models::cell::CellData;
use notebook_chat::runner::{runner_fn, RunInvocation};

use super::test_helpers::{controller, languages, scripted_runner, single_user_cell};

#[tokio::test]
async fn execution_order_increments_per_run() {
    let document = single_user_cell();
    let (runner, _) = scripted_runner(&["a"]);
    let (controller, _) = controller(&document, runner);

    let first = controller.execute_cell(0).await;
    let second = controller.execute_cell(0).await;

    assert!(first.success && second.success);
    let orders: Vec<Option<u32>> = document
        .executions()
        .iter()
        .map(|record| record.execution_order)
        .collect();
    assert_eq!(orders, vec![Some(1), Some(2)]);
}

#[tokio::test]
async fn rerun_reuses_response_cell() {
    let document = single_user_cell();
    let (runner, _) = scripted_runner(&["answer"]);
    let (controller, _) = controller(&document, runner);

    controller.execute_cell(0).await;
    let again = controller.execute_cell(0).await;

    assert!(again.success);
    assert!(!again.response_inserted);
    assert_eq!(again.next_user_index, None);
    assert_eq!(languages(&document), vec!["user", "assistant", "user"]);
    assert_eq!(document.cell(1).map(|c| c.text), Some("answer".to_owned()));
}

#[tokio::test]
async fn follow_up_turn_extends_conversation() {
    let document = single_user_cell();
    let (runner, seen) = scripted_runner(&["reply"]);
    let (controller, _) = controller(&document, runner);

    controller.execute_cell(0).await;
    document.replace_cell_text(2, "and then?").await.expect("type follow-up");
    seen.lock().unwrap().clear();
    let outcome = controller.execute_cell(2).await;

    assert!(outcome.success);
    assert_eq!(outcome.response_index, Some(3));
    assert_eq!(
        languages(&document),
        vec!["user", "assistant", "user", "assistant", "user"]
    );
    let roles: Vec<String> = seen.lock().unwrap().iter().map(|m| m.role.clone()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user"]);
}

#[tokio::test]
async fn batch_indices_shift_past_inserted_cells() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "one"),
        CellData::code("user", "two"),
    ]);
    let (runner, _) = scripted_runner(&["ok"]);
    let (controller, _) = controller(&document, runner);

    let outcomes = controller.execute_cells(&[0, 1]).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(outcomes[0].response_index, Some(1));
    assert_eq!(outcomes[1].response_index, Some(3));
    assert_eq!(
        languages(&document),
        vec!["user", "assistant", "user", "assistant", "user"]
    );
    assert_eq!(document.cell(2).map(|c| c.text), Some("two".to_owned()));
}

#[tokio::test]
async fn batch_shifts_past_cell_left_by_rejected_retag() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "one"),
        CellData::code("user", "two"),
    ]);
    document.reject_next_language_changes(1);
    let (runner, seen) = scripted_runner(&["ok"]);
    let (controller, _) = controller(&document, runner);

    let outcomes = controller.execute_cells(&[0, 1]).await;

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].stray_index, Some(1));
    assert_eq!(outcomes[0].response_index, None);
    assert_eq!(outcomes[0].cells_inserted(), 1);
    assert!(outcomes[1].success);
    assert_eq!(outcomes[1].response_index, Some(3));
    assert_eq!(document.cell(2).map(|c| c.text), Some("two".to_owned()));
    assert_eq!(document.cell(3).map(|c| c.text), Some("ok".to_owned()));
    let last = seen.lock().unwrap().last().map(|m| m.content.clone());
    assert_eq!(last, Some("two".to_owned()));
}

#[tokio::test]
async fn dropped_run_is_no_longer_interruptible() {
    let document = single_user_cell();
    let runner = runner_fn(|invocation: RunInvocation| async move {
        invocation.output.append_output("waiting").await?;
        std::future::pending::<()>().await;
        Ok(())
    });
    let (controller, _) = controller(&document, Arc::new(runner));

    let result = tokio::time::timeout(Duration::from_millis(50), controller.execute_cell(0)).await;

    assert!(result.is_err(), "run should still be pending");
    assert!(!controller.interrupt());
}

#[tokio::test]
async fn interrupt_without_run_is_false() {
    let document = single_user_cell();
    let (runner, _) = scripted_runner(&[]);
    let (controller, _) = controller(&document, runner);

    assert!(!controller.interrupt());
}

#[tokio::test]
async fn interrupt_stops_output_and_batch() {
    let document = InMemoryDocument::with_cells(vec![
        CellData::code("user", "one"),
        CellData::code("user", "two"),
    ]);
    let runner = runner_fn(|invocation: RunInvocation| async move {
        invocation.output.append_output("started").await?;
        invocation.output.cancellation().cancelled().await;
        invocation.output.append_output(" never shown").await?;
        Ok(())
    });
    let (controller, _) = controller(&document, Arc::new(runner));
    let controller = Arc::new(controller);

    let interrupter = Arc::clone(&controller);
    let stopper = tokio::spawn(async move {
        loop {
            if interrupter.interrupt() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let outcomes = tokio::time::timeout(Duration::from_secs(5), controller.execute_cells(&[0, 1]))
        .await
        .expect("batch should stop after interrupt");
    stopper.await.expect("stopper task");

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(document.cell(1).map(|c| c.text), Some("started".to_owned()));
    assert_eq!(document.executions().len(), 1);
}
