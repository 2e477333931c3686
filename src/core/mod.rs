mod account;
mod txn;

pub use account::Account;
pub use txn::Transaction;
