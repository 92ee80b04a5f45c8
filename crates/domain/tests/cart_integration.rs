//! Integration tests for the cart: catalog lookups, row merging, quantity
//! floors and the derived totals.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use common::IdempotencyKey;
use domain::{
    Cart, Catalog, Category, InMemoryCatalog, LineItem, Money, NewOrder, OwnerId, Product,
    ProductId, cart_total, item_count,
};
use proptest::prelude::*;

fn product(id: &str, cents: i64) -> Product {
    Product::new(id, format!("Product {id}"), Money::from_cents(cents), Category::Digital).unwrap()
}

mod row_invariants {
    use super::*;

    fn assert_distinct(cart: &Cart) {
        let ids: HashSet<&ProductId> = cart.items().iter().map(LineItem::product_id).collect();
        assert_eq!(ids.len(), cart.items().len(), "duplicate rows in {cart:?}");
        assert!(cart.items().iter().all(|item| item.quantity() >= 1));
    }

    #[derive(Debug, Clone)]
    enum Mutation {
        Add(usize, i64),
        SetQuantity(usize, i64),
        Remove(usize),
    }

    fn mutations() -> impl Strategy<Value = Vec<Mutation>> {
        proptest::collection::vec(
            prop_oneof![
                (0..4usize, -3i64..20).prop_map(|(p, q)| Mutation::Add(p, q)),
                (0..4usize, -3i64..20).prop_map(|(p, q)| Mutation::SetQuantity(p, q)),
                (0..4usize).prop_map(Mutation::Remove),
            ],
            0..48,
        )
    }

    proptest! {
        #[test]
        fn mutation_sequences_never_duplicate_rows(ops in mutations()) {
            let products: Vec<Product> =
                (0..4).map(|i| product(&format!("SKU-{i}"), 500)).collect();
            let mut cart = Cart::new();
            // Expected quantity per product index.
            let mut expected: HashMap<usize, u32> = HashMap::new();

            for op in ops {
                match op {
                    Mutation::Add(p, q) => {
                        cart.add(&products[p], q);
                        *expected.entry(p).or_insert(0) += q.max(1) as u32;
                    }
                    Mutation::SetQuantity(p, q) => {
                        cart.set_quantity(&products[p].id, q);
                        if let Some(quantity) = expected.get_mut(&p) {
                            *quantity = q.max(1) as u32;
                        }
                    }
                    Mutation::Remove(p) => {
                        cart.remove(&products[p].id);
                        expected.remove(&p);
                    }
                }

                assert_distinct(&cart);
                prop_assert_eq!(cart.distinct_count(), expected.len());
                for (p, quantity) in &expected {
                    prop_assert_eq!(cart.get(&products[*p].id).map(LineItem::quantity), Some(*quantity));
                }
            }
        }
    }

    #[test]
    fn repeated_adds_merge_into_one_row() {
        let widget = product("SKU-1", 250);
        let mut cart = Cart::new();

        cart.add(&widget, 2);
        cart.add(&widget, 3);

        assert_eq!(cart.distinct_count(), 1);
        assert_eq!(cart.get(&widget.id).unwrap().quantity(), 5);
    }

    #[test]
    fn quantity_never_drops_below_one() {
        let widget = product("SKU-1", 250);
        let mut cart = Cart::new();
        cart.add(&widget, 1);

        cart.adjust_quantity(&widget.id, -10);
        assert_eq!(cart.get(&widget.id).unwrap().quantity(), 1);

        cart.set_quantity(&widget.id, 0);
        assert_eq!(cart.get(&widget.id).unwrap().quantity(), 1);

        cart.remove(&widget.id);
        assert!(cart.is_empty());
    }
}

mod totals {
    use super::*;

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), Money::zero());
        assert_eq!(cart_total(&[]).to_fixed2(), "0.00");
        assert_eq!(item_count(&[]), 0);
    }

    #[test]
    fn totals_follow_the_rows() {
        let items = vec![
            LineItem::new("SKU-1", "Gadget", Money::from_cents(1999), 3),
            LineItem::new("SKU-2", "Cable", Money::from_cents(500), 2),
        ];

        assert_eq!(cart_total(&items[..1]).to_fixed2(), "59.97");
        assert_eq!(cart_total(&items).to_fixed2(), "69.97");
        assert_eq!(item_count(&items), 5);
        assert_eq!(items.len(), 2);
    }
}

mod catalog_snapshots {
    use super::*;

    #[tokio::test]
    async fn cart_keeps_price_seen_at_add_time() {
        let catalog = InMemoryCatalog::with_products([product("SKU-1", 1000)]);
        let id = ProductId::new("SKU-1");
        let mut cart = Cart::new();

        let listed = catalog.product(&id).await.unwrap();
        cart.add(&listed, 2);
        catalog.upsert(product("SKU-1", 1500)).await;

        assert_eq!(cart.total(), Money::from_cents(2000));
        assert_eq!(
            catalog.product(&id).await.unwrap().unit_price,
            Money::from_cents(1500)
        );
    }

    #[tokio::test]
    async fn order_is_detached_from_cart() {
        let mut cart = Cart::new();
        cart.add(&product("SKU-1", 1000), 2);

        let order = NewOrder::from_snapshot(
            IdempotencyKey::new(),
            OwnerId::new("uid-1"),
            &cart.snapshot(),
            "PAY-0001".to_string(),
            Utc::now(),
        )
        .unwrap();
        cart.clear();

        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total().to_fixed2(), "20.00");
    }
}
