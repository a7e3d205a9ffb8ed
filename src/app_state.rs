use std::sync::Arc;

use crate::{config::Config, ledger::Ledger, nfc::NfcReader};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub config: Arc<Config>,
    pub nfc: Arc<NfcReader>,
}
