mod common;

use assert_matches::assert_matches;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use requisition_tracker::{
    commands::{
        AddLineItemCommand, Command, CommandContext, RemoveLineItemCommand, UpdateLineItemCommand,
    },
    services::ledger::{self, LineItemChanges},
    store::{MemoryStorage, RequisitionStore},
    Requisition, ServiceError,
};

async fn add(
    store: &mut RequisitionStore<MemoryStorage>,
    description: &str,
    quantity: u32,
    unit_price: Decimal,
) -> Result<String, ServiceError> {
    let actor = common::requester();
    AddLineItemCommand {
        item: common::item(description, quantity, unit_price),
    }
    .execute(&mut CommandContext::new(store, &actor))
    .await
    .map(|added| added.item.id)
}

#[tokio::test]
async fn four_items_total_to_the_cent() {
    let mut store = RequisitionStore::open(MemoryStorage::new());
    add(&mut store, "Printer paper", 2, dec!(50.00)).await.unwrap();
    add(&mut store, "Stapler", 1, dec!(25.50)).await.unwrap();
    add(&mut store, "Pens", 3, dec!(10.00)).await.unwrap();
    add(&mut store, "Desk lamp", 1, dec!(99.99)).await.unwrap();

    let req = store.get();
    assert_eq!(req.line_items.len(), 4);
    assert_eq!(req.total_amount, dec!(255.49));
    assert_eq!(req.total_amount, ledger::recompute_total(&req.line_items).unwrap());
}

#[tokio::test]
async fn update_and_remove_keep_total_consistent() {
    let mut store = RequisitionStore::open(MemoryStorage::new());
    let actor = common::requester();
    let paper = add(&mut store, "Printer paper", 2, dec!(50.00)).await.unwrap();
    let pens = add(&mut store, "Pens", 3, dec!(10.00)).await.unwrap();

    let updated = UpdateLineItemCommand {
        id: paper.clone(),
        changes: LineItemChanges {
            quantity: Some(5),
            unit_price: Some(dec!(12.25)),
            ..Default::default()
        },
    }
    .execute(&mut CommandContext::new(&mut store, &actor))
    .await
    .unwrap();
    assert_eq!(updated.item.total_price(), dec!(61.25));
    assert_eq!(updated.total_amount, dec!(91.25));

    let total = RemoveLineItemCommand { id: pens }
        .execute(&mut CommandContext::new(&mut store, &actor))
        .await
        .unwrap();
    assert_eq!(total, dec!(61.25));
    assert_eq!(store.get().line_items.len(), 1);
    assert_eq!(store.get().line_item(&paper).unwrap().quantity, 5);
}

#[rstest]
#[case::empty_description("", 1, dec!(1.00))]
#[case::blank_description("   ", 1, dec!(1.00))]
#[case::zero_quantity("Chair", 0, dec!(1.00))]
#[case::zero_price("Chair", 1, dec!(0))]
#[case::negative_price("Chair", 1, dec!(-3.50))]
#[case::overflowing_line_total("Yacht", 2, Decimal::MAX)]
#[tokio::test]
async fn invalid_additions_leave_state_unchanged(
    #[case] description: &str,
    #[case] quantity: u32,
    #[case] unit_price: Decimal,
) {
    let mut store = RequisitionStore::open(MemoryStorage::new());
    add(&mut store, "Existing", 1, dec!(10.00)).await.unwrap();
    let snapshot = store.get().clone();

    let result = add(&mut store, description, quantity, unit_price).await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert_eq!(store.get(), &snapshot);
}

#[tokio::test]
async fn line_items_are_locked_after_submission() {
    let mut store = common::submitted().await;
    let snapshot = store.get().clone();

    assert_matches!(
        add(&mut store, "Late addition", 1, dec!(5.00)).await,
        Err(ServiceError::InvalidStatus(_))
    );
    let id = snapshot.line_items[0].id.clone();
    let actor = common::requester();
    assert_matches!(
        RemoveLineItemCommand { id }
            .execute(&mut CommandContext::new(&mut store, &actor))
            .await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_eq!(store.get(), &snapshot);
}

#[test]
fn recompute_total_of_nothing_is_zero() {
    assert_eq!(ledger::recompute_total(&[]).unwrap(), Decimal::ZERO);
    let req = Requisition::new_draft(chrono::Utc::now());
    assert_eq!(ledger::recompute_total(&req.line_items).unwrap(), req.total_amount);
}
