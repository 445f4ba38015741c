use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crate::policy::{PolicyStore, ReconcileRequest};
use serenity::prelude::TypeMapKey;
use tokio::sync::mpsc::Sender;

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map
impl TypeMapKey for Data {
    type Value = Data;
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("store", &self.store)
            .field("reconciler_tx", &self.reconciler_tx.is_some())
            .finish()
    }
}

impl Data {
    /// Create a new Data instance
    #[must_use]
    pub fn new() -> Self {
        Self(DataInner::new().into())
    }

    /// Set the reconciliation task sender
    pub fn set_reconciler_tx(&mut self, tx: Sender<ReconcileRequest>) {
        Arc::make_mut(&mut self.0).reconciler_tx = Arc::new(Some(tx));
    }

    /// Get a sender for the reconciliation task, if it is running
    #[must_use]
    pub fn reconciler_tx(&self) -> Option<Sender<ReconcileRequest>> {
        (*self.0.reconciler_tx).clone()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Data {
    fn deref_mut(&mut self) -> &mut Self::Target {
        Arc::make_mut(&mut self.0)
    }
}

/// Main centralized data structure for the bot
#[derive(Clone)]
pub struct DataInner {
    /// Policy configuration and timer state shared with the reconciler
    pub store: PolicyStore,
    /// Channel to the reconciliation task
    pub reconciler_tx: Arc<Option<Sender<ReconcileRequest>>>,
}

impl Default for DataInner {
    fn default() -> Self {
        Self::new()
    }
}

impl DataInner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: PolicyStore::new(),
            reconciler_tx: Arc::new(None),
        }
    }
}
