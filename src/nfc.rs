use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Something that can see NFC tags: a PC/SC reader, a serial device, a test script.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// Wait up to `timeout` for a tag and return its raw UID.
    async fn read_uid(&self, timeout: Duration) -> Result<Option<Vec<u8>>>;
}

/// Used when no reader is attached. Never sees a card.
pub struct NoHardware;

#[async_trait]
impl CardSource for NoHardware {
    async fn read_uid(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        tokio::time::sleep(timeout).await;
        Ok(None)
    }
}

/// Replays a fixed list of UIDs, one per read, then behaves like [`NoHardware`].
#[derive(Default)]
pub struct ScriptedSource {
    uids: Mutex<VecDeque<Vec<u8>>>,
}

impl ScriptedSource {
    pub fn new<I>(uids: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            uids: Mutex::new(uids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl CardSource for ScriptedSource {
    async fn read_uid(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let next = self
            .uids
            .lock()
            .map_err(|_| anyhow::anyhow!("scripted source poisoned"))?
            .pop_front();
        if next.is_none() {
            tokio::time::sleep(timeout).await;
        }
        Ok(next)
    }
}

/// Running background scan; pass it back to [`NfcReader::stop`].
pub struct ScanHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The process's NFC reader.
///
/// Card ids are the tag UID as uppercase hex. The most recent id seen by a
/// continuous scan is kept until someone takes it.
pub struct NfcReader {
    source: Arc<dyn CardSource>,
    poll_interval: Duration,
    latest: Arc<Mutex<Option<String>>>,
}

impl NfcReader {
    pub fn new(source: Arc<dyn CardSource>, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Waits for a single card.
    pub async fn one_shot(&self, timeout: Duration) -> Result<Option<String>> {
        let uid = self.source.read_uid(timeout).await?;
        Ok(uid.map(hex::encode_upper))
    }

    /// Polls the source until stopped, calling `callback` for every card seen.
    pub fn start_continuous<F>(&self, callback: F) -> ScanHandle
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let (stop, mut stopped) = oneshot::channel();
        let source = self.source.clone();
        let latest = self.latest.clone();
        let interval = self.poll_interval;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    read = source.read_uid(interval) => match read {
                        Ok(Some(uid)) => {
                            let card_id = hex::encode_upper(uid);
                            debug!(card_id = %card_id, "NFC card scanned");
                            if let Ok(mut slot) = latest.lock() {
                                *slot = Some(card_id.clone());
                            }
                            callback(card_id);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("NFC read failed: {:#}", e);
                            tokio::time::sleep(interval).await;
                        }
                    },
                }
            }
            debug!("NFC scanning stopped");
        });

        ScanHandle { stop, task }
    }

    pub async fn stop(&self, handle: ScanHandle) {
        // The task may already have exited; either way it is done after the join
        let _ = handle.stop.send(());
        if let Err(e) = handle.task.await {
            warn!("NFC scan task ended abnormally: {}", e);
        }
    }

    /// Returns the last scanned id and clears it.
    pub fn take_latest(&self) -> Option<String> {
        self.latest.lock().ok().and_then(|mut slot| slot.take())
    }
}
