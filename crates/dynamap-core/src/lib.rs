//! # dynamap
//!
//! Typed record mapping for DynamoDB-style key-value stores.
//!
//! dynamap turns plain serde types into the store's tagged attribute values
//! and back, compiles predicate trees into placeholder-bound condition
//! expressions, and drains cursor-paginated reads into typed results. The
//! store itself is behind the [`Store`](store::Store) trait; the bundled
//! [`MemoryStore`](store::MemoryStore) implements it in process.
//!
//! ## Quick Start
//!
//! ```
//! use dynamap_core::api::condition::{eq, gt};
//! use dynamap_core::api::{Record, Table};
//! use dynamap_core::store::{KeySchema, MemoryStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Order {
//!     #[serde(rename = "Customer")]
//!     customer: String,
//!     #[serde(rename = "Number")]
//!     number: u32,
//!     total: f64,
//! }
//!
//! impl Record for Order {
//!     const HASH_KEY: &'static str = "Customer";
//!     const RANGE_KEY: Option<&'static str> = Some("Number");
//! }
//!
//! let store = MemoryStore::new();
//! store
//!     .create_collection("orders", KeySchema::new("Customer").with_range("Number"))
//!     .unwrap();
//!
//! let orders: Table<Order, _> = Table::new(&store, "orders");
//! for number in 1..=3 {
//!     let order = Order { customer: "ada".into(), number, total: 10.0 * number as f64 };
//!     orders.put(&order).if_absent().execute().unwrap();
//! }
//!
//! let big = orders
//!     .query(eq("Customer", "ada"))
//!     .filter(gt("total", 15))
//!     .execute()
//!     .unwrap();
//! assert_eq!(big.len(), 2);
//! ```

pub mod api;
pub mod encoding;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Error, Result};
