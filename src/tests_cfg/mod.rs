//! Shared test fixtures: a small shop schema.
//!
//! - `Customer` (customers) has_one `profile`, has_many `orders`,
//!   has_many_through `products`
//! - `Profile` (profiles) belongs_to `customer`
//! - `Order` (orders) belongs_to `customer`; subtypes `RushOrder` and
//!   `GiftOrder` share the table
//! - `Product` (products)

use crate::schema::{AssociationDef, AssociationKind, ColumnType, EntityDef, Schema};

pub fn shop_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .define(
            EntityDef::new("Customer", "customers")
                .column("id", ColumnType::Integer)
                .column("name", ColumnType::String)
                .column("email", ColumnType::String)
                .column("born_on", ColumnType::Date)
                .column("region_id", ColumnType::Integer)
                .column("orders_count", ColumnType::Integer)
                .has_one("profile", "Profile")
                .has_many("orders", "Order")
                .has_many_through("products", "Product"),
        )
        .define(
            EntityDef::new("Profile", "profiles")
                .column("id", ColumnType::Integer)
                .column("customer_id", ColumnType::Integer)
                .column("bio", ColumnType::Text)
                .column("level", ColumnType::Integer)
                .belongs_to("customer", "Customer"),
        )
        .define(
            EntityDef::new("Order", "orders")
                .column("id", ColumnType::Integer)
                .column("type", ColumnType::String)
                .column("customer_id", ColumnType::Integer)
                .column("total", ColumnType::Decimal)
                .column("placed_on", ColumnType::Date)
                .association(
                    AssociationDef::new("buyer", AssociationKind::BelongsTo, "Customer")
                        .foreign_key("customer_id"),
                )
                .belongs_to("customer", "Customer"),
        )
        .define(EntityDef::subtype("RushOrder", "Order"))
        .define(EntityDef::subtype("GiftOrder", "Order"))
        .define(
            EntityDef::new("Product", "products")
                .column("id", ColumnType::Integer)
                .column("title", ColumnType::String),
        );
    schema
}
