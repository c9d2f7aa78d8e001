//! Public API: typed tables, builder-pattern reads and writes, conditions and paging.

pub mod builders;
pub mod condition;
pub mod expression;
pub mod pager;
pub mod projection;
pub mod record;
pub mod table;

pub use builders::{PutBuilder, QueryBuilder, ScanBuilder};
pub use condition::{Condition, Connective, Operator, Predicate};
pub use expression::{Expression, ExpressionBuilder};
pub use pager::Pager;
pub use record::Record;
pub use table::Table;
