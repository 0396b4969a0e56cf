use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::chain::Ledger;

/// Errors that can occur when controlling the continuous miner
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Mining is already in progress")]
    AlreadyMining,

    #[error("There is no mining in progress")]
    NotMining,

    #[error("A miner address is required to start continuous mining")]
    InvalidMiner,
}

struct MiningJob {
    miner_address: String,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl MiningJob {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Background loop mining a block every `interval`
///
/// At most one loop runs at a time. Stopping is cooperative: the loop sees
/// the signal between cycles, so a block being mined is still appended, and
/// `stop` returns once the loop has exited.
pub struct ContinuousMiner {
    ledger: Arc<Ledger>,
    interval: Duration,
    job: Mutex<Option<MiningJob>>,
}

impl std::fmt::Debug for ContinuousMiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let miner_address = self
            .job
            .try_lock()
            .ok()
            .and_then(|job| job.as_ref().map(|j| j.miner_address.clone()));

        f.debug_struct("ContinuousMiner")
            .field("interval", &self.interval)
            .field("miner_address", &miner_address)
            .finish()
    }
}

impl ContinuousMiner {
    /// Creates a stopped miner for `ledger`
    pub fn new(ledger: Arc<Ledger>, interval: Duration) -> Self {
        ContinuousMiner {
            ledger,
            interval,
            job: Mutex::new(None),
        }
    }

    /// Starts mining to `miner_address` every interval
    pub async fn start(&self, miner_address: &str) -> Result<(), MinerError> {
        let miner_address = miner_address.trim();
        if miner_address.is_empty() {
            return Err(MinerError::InvalidMiner);
        }

        let mut job = self.job.lock().await;
        if job.as_ref().is_some_and(MiningJob::is_running) {
            return Err(MinerError::AlreadyMining);
        }

        let (stop, stop_signal) = watch::channel(false);
        let handle = tokio::spawn(mining_loop(
            self.ledger.clone(),
            miner_address.to_string(),
            self.interval,
            stop_signal,
        ));

        info!(
            "Continuous mining started for {} every {:?}",
            miner_address, self.interval
        );
        *job = Some(MiningJob {
            miner_address: miner_address.to_string(),
            stop,
            handle,
        });
        Ok(())
    }

    /// Stops the running loop and waits for it to exit
    ///
    /// The job stays locked until then, so a concurrent `start` cannot
    /// overlap with the loop being stopped.
    ///
    /// # Returns
    ///
    /// The address the loop was mining to
    pub async fn stop(&self) -> Result<String, MinerError> {
        let mut job = self.job.lock().await;
        let MiningJob {
            miner_address,
            stop,
            handle,
        } = job
            .take()
            .filter(MiningJob::is_running)
            .ok_or(MinerError::NotMining)?;

        // The loop may already be gone; nothing to signal then
        let _ = stop.send(true);
        if let Err(err) = handle.await {
            warn!("Continuous mining loop for {} ended abnormally: {}", miner_address, err);
        }

        info!("Continuous mining stopped for {}", miner_address);
        Ok(miner_address)
    }

    /// Checks if a loop is running
    pub async fn is_active(&self) -> bool {
        self.job.lock().await.as_ref().is_some_and(MiningJob::is_running)
    }

    /// Gets the address the running loop mines to
    pub async fn miner_address(&self) -> Option<String> {
        self.job
            .lock()
            .await
            .as_ref()
            .filter(|j| j.is_running())
            .map(|j| j.miner_address.clone())
    }
}

impl Drop for ContinuousMiner {
    fn drop(&mut self) {
        if let Some(job) = self.job.get_mut().take() {
            let _ = job.stop.send(true);
        }
    }
}

async fn mining_loop(
    ledger: Arc<Ledger>,
    miner_address: String,
    interval: Duration,
    mut stop_signal: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_signal.changed() => break,
            _ = ticker.tick() => {}
        }
        if *stop_signal.borrow() {
            break;
        }

        match ledger.mine_block(&miner_address).await {
            Ok(block) => info!(
                "Continuous miner appended block {} with {} transaction(s)",
                block.index,
                block.transactions.len()
            ),
            Err(err) => error!("Continuous mining cycle failed: {}", err),
        }
    }
}
