use std::io::Write;

use anyhow::Result;
use tabwriter::TabWriter;

use crate::core::Account;

pub fn print_accounts<T: std::io::Write>(wr: T, accounts: &[Account]) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(tw, "Account\tDate\tDescription\tAmount")?;

    for account in accounts.iter() {
        for tx in account.transactions() {
            writeln!(
                tw,
                "{}\t{}\t{}\t{:.2}",
                account.name(),
                tx.date(),
                tx.description(),
                tx.amount(),
            )?;
        }
    }

    tw.flush()?;

    Ok(())
}
