mod common;

use std::any::TypeId;
use std::sync::Arc;
use std::thread;

use autocrud::{AggregateKind, KeyKind, Registry};
use common::{Order, Product, User};

#[test]
fn test_users_and_products_register_independently() {
    let registry = Registry::new();

    let users = registry.parse::<User>().unwrap();
    assert_eq!(users.name(), "User");
    assert_eq!(users.table_name(), "users");
    assert_eq!(users.resource_segment(), "user");
    assert_eq!(users.type_id(), TypeId::of::<User>());
    assert_eq!(users.fields().len(), 5);
    let pk = users.primary_key().unwrap();
    assert_eq!(pk.name, "id");
    assert_eq!(pk.key_kind(), KeyKind::Integer);
    assert!(users.field("password").unwrap().is_hidden);
    assert!(users.field("created_by").unwrap().is_read_only);
    assert!(users.aggregates().is_empty());

    let products = registry.parse::<Product>().unwrap();
    assert_eq!(products.table_name(), "catalog_products");
    assert_eq!(products.primary_key().unwrap().name, "id");
    assert_eq!(products.field("price").unwrap().column, "unit_price");
    assert_eq!(products.field_by_column("unit_price").unwrap().name, "price");
    let fk = products.field("owner_id").unwrap().foreign_key.clone().unwrap();
    assert_eq!((fk.table.as_str(), fk.field.as_str()), ("users", "id"));

    assert_eq!(registry.len(), 2);
    assert!(!Arc::ptr_eq(&users, &products));
}

#[test]
fn test_aggregates_and_lists_are_described() {
    let registry = Registry::new();
    let orders = registry.parse::<Order>().unwrap();

    assert!(orders.field("items").unwrap().is_list);
    assert_eq!(orders.field("items").unwrap().type_name, "Vec<LineItem>");

    let count = orders.aggregate("item_count").unwrap();
    assert_eq!(count.kind, AggregateKind::Count);
    assert_eq!(count.path, "Items");

    let total = orders.aggregate("total").unwrap();
    assert_eq!(total.kind, AggregateKind::Sum);
    assert_eq!(total.path, "Items.Price");

    assert!(orders.is_aggregate_field("total"));
    assert!(!orders.is_aggregate_field("customer"));
}

#[test]
fn test_boxed_type_shares_the_cached_descriptor() {
    let registry = Registry::new();
    let direct = registry.parse::<User>().unwrap();
    let boxed = registry.parse::<Box<User>>().unwrap();
    let arced = registry.parse::<Arc<User>>().unwrap();
    let by_value = registry.parse_value(&User::default()).unwrap();

    assert!(Arc::ptr_eq(&direct, &boxed));
    assert!(Arc::ptr_eq(&direct, &arced));
    assert!(Arc::ptr_eq(&direct, &by_value));
    assert_eq!(registry.len(), 1);
    assert!(Arc::ptr_eq(&registry.get(TypeId::of::<User>()).unwrap(), &direct));
}

#[test]
fn test_double_indirection_and_scalars_are_rejected() {
    let registry = Registry::new();
    assert!(registry.parse::<Box<Box<User>>>().is_err());
    let err = registry.parse::<u32>().unwrap_err();
    assert_eq!(err.type_name, "u32");
    assert_eq!(err.to_string(), "cannot resolve `u32` to a struct type");
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_parse_yields_one_instance() {
    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.parse::<Order>().unwrap())
        })
        .collect();
    let parsed: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for descriptor in &parsed[1..] {
        assert!(Arc::ptr_eq(&parsed[0], descriptor));
    }
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_clear_reparses() {
    let registry = Registry::new();
    let before = registry.parse::<Product>().unwrap();
    registry.clear();
    assert!(registry.get(TypeId::of::<Product>()).is_none());

    let after = registry.parse::<Product>().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(before.fields(), after.fields());
}
