pub mod columns;
pub mod head;
pub mod money;
pub mod table;

pub use columns::{ColumnAliases, ColumnError, Field, StatementColumns};
pub use head::{TransactionHead, INTERBANK, REVIEW_REQUIRED};
pub use money::Money;
pub use table::{Cell, Table};
