pub mod inventory;
pub mod chemical;
pub mod role;

pub use inventory::{
    ActionType, TransactionRow, TransactionRecord, NewTransaction,
    BalanceRecord, BatchSummary,
};
pub use chemical::{
    ChemTransactionRow, ChemTransaction, NewChemTransaction, TankMovement, TankBalance
};
pub use role::{Role, View};
