use super::{ApplyOutcome, StoreError, WalletStore};

use crate::ids::UserId;
use crate::ledger::{Ledger, Prepared};
use crate::models::{NewTransaction, Wallet, WalletTransaction};
use crate::Coins;

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const WALLETS_FILE: &str = "wallets.csv";

/// File-backed store: an append-only `transactions.csv` log, and a `wallets.csv` balance snapshot
/// rewritten after every commit. A transaction counts as committed once its log row is synced;
/// balances are rebuilt from the log on open.
#[derive(Debug)]
pub struct CsvStore {
    dir: PathBuf,
    ledger: Mutex<Ledger>,
}

impl CsvStore {
    /// Opens (or initialises) a data directory
    pub fn open(dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let dir = dir.into();

        fs::create_dir_all(&dir)
            .with_context(|| format!("Couldn't create data directory {dir:?}"))?;

        let (wallets, history) = Self::read_snapshot(&dir)?;

        log::info!(
            "Loaded {} transactions and {} wallets from {dir:?}",
            history.len(),
            wallets.len()
        );

        let ledger = Ledger::restore(history, wallets)?;

        Ok(Self {
            dir,
            ledger: Mutex::new(ledger),
        })
    }

    /// Reads the stored wallets and transaction log of a data directory, missing files being empty
    pub fn read_snapshot(dir: &Path) -> crate::Result<(Vec<Wallet>, Vec<WalletTransaction>)> {
        let wallets = read_records::<Wallet>(&dir.join(WALLETS_FILE))?;
        let history = read_records::<WalletTransaction>(&dir.join(TRANSACTIONS_FILE))?;

        Ok((wallets, history))
    }

    fn append_transaction(&self, transaction: &WalletTransaction) -> crate::Result {
        let path = self.dir.join(TRANSACTIONS_FILE);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Couldn't open transaction log {path:?}"))?;

        let write_headers = file.metadata()?.len() == 0;

        let mut wtr = WriterBuilder::new()
            .has_headers(write_headers)
            .from_writer(file);

        wtr.serialize(transaction)?;
        wtr.flush()?;

        let file = wtr.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;

        Ok(())
    }

    fn write_wallets(&self, wallets: &[Wallet]) -> crate::Result {
        let path = self.dir.join(WALLETS_FILE);
        let tmp_path = self.dir.join(format!("{WALLETS_FILE}.tmp"));

        let file = File::create(&tmp_path)
            .with_context(|| format!("Couldn't create wallet snapshot {tmp_path:?}"))?;

        let mut wtr = WriterBuilder::new().from_writer(file);
        for wallet in wallets {
            wtr.serialize(wallet)?;
        }
        wtr.flush()?;

        let file = wtr.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Couldn't replace wallet snapshot {path:?}"))?;

        Ok(())
    }
}

impl WalletStore for CsvStore {
    fn apply(&self, new: NewTransaction) -> Result<ApplyOutcome, StoreError> {
        let mut ledger = self.ledger.lock();

        let prepared = ledger.prepare(new)?;

        if let Prepared::Commit {
            transaction,
            balance,
        } = &prepared
        {
            // the log is the source of truth, so it is written before anything else moves
            self.append_transaction(transaction)?;

            ledger.commit(transaction.clone(), *balance);

            // a stale snapshot is repaired by the next commit or the next open
            if let Err(e) = self.write_wallets(&ledger.wallets()) {
                log::error!(
                    "Committed transaction {} but failed to rewrite wallet snapshot: {e:#}",
                    transaction.id
                );
            }
        }

        Ok(prepared.into())
    }

    fn balance(&self, user_id: &UserId) -> Result<Coins, StoreError> {
        Ok(self.ledger.lock().balance(user_id))
    }

    fn transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, StoreError> {
        Ok(self.ledger.lock().transactions_for(user_id))
    }

    fn wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        Ok(self.ledger.lock().wallets())
    }

    fn history(&self) -> Result<Vec<WalletTransaction>, StoreError> {
        Ok(self.ledger.lock().history().to_vec())
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> crate::Result<Vec<T>> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Couldn't open {path:?}"))?;

    let mut records = vec![];
    for (idx, record) in rdr.deserialize::<T>().enumerate() {
        let record = record.with_context(|| format!("Couldn't parse record {} of {path:?}", idx + 1))?;
        records.push(record);
    }

    Ok(records)
}
