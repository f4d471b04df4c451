//! Aggregate and nested annotations produce descriptors

use autocrud::{AggregateKind, Entity, Registry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Item {
    pub price: i64,
}

#[derive(Debug, Default, Serialize, Deserialize, Entity)]
pub struct Order {
    #[storage("primaryKey")]
    pub id: i64,
    #[crud("nested")]
    pub shipping: Address,
    #[crud("list")]
    pub items: Vec<Item>,
    #[crud("count:Items")]
    pub item_count: i64,
    #[crud("sum:Items.Price")]
    pub total: i64,
}

fn main() {
    let registry = Registry::new();
    let order = registry.parse::<Order>().unwrap();

    assert_eq!(order.table_name(), "orders");
    assert_eq!(order.primary_key().unwrap().name, "id");
    assert_eq!(order.aggregates().len(), 2);
    assert_eq!(order.aggregate("item_count").unwrap().kind, AggregateKind::Count);
    assert_eq!(order.aggregate("total").unwrap().path, "Items.Price");
    assert_eq!(order.nested()[0].name, "shipping");
    assert_eq!(order.nested()[0].path, vec![1]);
    assert!(order.field("items").unwrap().is_list);
}
