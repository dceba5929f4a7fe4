//! Shared test fixtures: an in-memory database seeded with one company, one
//! location, a customer, a cash payment method, a 15% tax, and three products
//! (plain, taxed, serialized) with opening stock.

use meridian_core::Tenant;

use crate::pool::{Database, DbConfig};

pub(crate) struct Fixture {
    pub db: Database,
    pub tenant: Tenant,
    pub location_id: i64,
    pub customer_id: i64,
    pub payment_method_id: i64,
    pub tax_id: i64,
    /// Plain product, 10.00, no tax, 50 on hand.
    pub widget_id: i64,
    /// Taxed product (15%), 100.00, 20 on hand.
    pub gadget_id: i64,
    /// Serialized product, 500.00, 5 on hand.
    pub phone_id: i64,
}

pub(crate) async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database");

    let pool = db.pool();

    sqlx::query("INSERT INTO companies (company_id, name) VALUES (1, 'Acme Retail')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO locations (location_id, company_id, name) VALUES (1, 1, 'Main Store')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO customers (customer_id, company_id, name) VALUES (1, 1, 'Jordan Vale')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO payment_methods (method_id, company_id, name) VALUES (1, 1, 'Cash')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO taxes (tax_id, company_id, name, percentage) VALUES (1, 1, 'GST', 15.0)")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        r#"
        INSERT INTO products (product_id, company_id, name, selling_price, tax_id, is_serialized)
        VALUES (1, 1, 'Widget', 10.0, NULL, 0),
               (2, 1, 'Gadget', 100.0, 1, 0),
               (3, 1, 'Phone', 500.0, NULL, 1)
        "#,
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO stock (location_id, product_id, quantity, reserved_quantity, last_updated)
        VALUES (1, 1, 50.0, 0, ?1),
               (1, 2, 20.0, 0, ?1),
               (1, 3, 5.0, 0, ?1)
        "#,
    )
    .bind(chrono::Utc::now())
    .execute(pool)
    .await
    .unwrap();

    Fixture {
        db,
        tenant: Tenant {
            company_id: 1,
            user_id: 1,
        },
        location_id: 1,
        customer_id: 1,
        payment_method_id: 1,
        tax_id: 1,
        widget_id: 1,
        gadget_id: 2,
        phone_id: 3,
    }
}
