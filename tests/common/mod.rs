#![allow(dead_code)]

use requisition_tracker::{
    auth::{Actor, Role},
    commands::{AddLineItemCommand, Command, CommandContext, SubmitRequisitionCommand, UpdateDetailsCommand},
    services::ledger::NewLineItem,
    store::{MemoryStorage, RequisitionStore},
};
use rust_decimal::Decimal;

pub const REQUESTER: &str = "joan@corp.test";

pub fn requester() -> Actor {
    Actor::new(REQUESTER, "Joan Requester", Role::Requester)
}

pub fn finance() -> Actor {
    Actor::new("finance@corp.test", "Fiona Finance", Role::Finance)
}

pub fn coo() -> Actor {
    Actor::new("coo@corp.test", "Oscar Operations", Role::Coo)
}

pub fn cfo() -> Actor {
    Actor::new("cfo@corp.test", "Chloe Controller", Role::Cfo)
}

pub fn ceo() -> Actor {
    Actor::new("ceo@corp.test", "Edgar Executive", Role::Ceo)
}

pub fn admin() -> Actor {
    Actor::new("admin@corp.test", "Ada Admin", Role::Admin)
}

pub fn item(description: &str, quantity: u32, unit_price: Decimal) -> NewLineItem {
    NewLineItem {
        description: description.to_string(),
        quantity,
        unit_price,
    }
}

/// A Draft with every required field filled in and one line item.
pub async fn ready_draft() -> RequisitionStore<MemoryStorage> {
    let mut store = RequisitionStore::open(MemoryStorage::new());
    let actor = requester();
    let mut ctx = CommandContext::new(&mut store, &actor);

    UpdateDetailsCommand {
        title: Some("Office laptops".into()),
        requester: Some("Joan Requester".into()),
        department: Some("Operations".into()),
        justification: Some("Replacing end-of-life hardware".into()),
        date_requested: None,
    }
    .execute(&mut ctx)
    .await
    .expect("details can be set");

    AddLineItemCommand {
        item: item("Laptop", 2, Decimal::new(125000, 2)),
    }
    .execute(&mut ctx)
    .await
    .expect("line item can be added");

    store
}

/// A requisition submitted by [`requester`], waiting on Finance.
pub async fn submitted() -> RequisitionStore<MemoryStorage> {
    let mut store = ready_draft().await;
    let actor = requester();
    SubmitRequisitionCommand
        .execute(&mut CommandContext::new(&mut store, &actor))
        .await
        .expect("draft can be submitted");
    store
}
