use super::Transaction;

/// One account as listed on a bank's overview page.
///
/// Transactions are append-only during a single harvest and keep scrape
/// order, which is the order the site displayed them in and not
/// necessarily chronological. Accounts themselves are kept in an ordered
/// list: source-site display order is meaningful and names may collide.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    name: String,
    transactions: Vec<Transaction>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transactions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub(crate) fn push(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }
}
