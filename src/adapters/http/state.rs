use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use crate::application::buffer_pool::BufferPools;
use crate::application::services::PipelineService;

/// Estado compartido para los handlers de Axum.
#[derive(Clone)]
pub struct HttpState {
    /// Inferencia de frames, compartida por todas las conexiones.
    pub pipeline: Arc<PipelineService>,
    /// Buffers temporales; cada conexión toma de aquí su buffer de respuesta.
    pub pools: Arc<BufferPools>,
    /// Pasa a `true` cuando el proceso empieza a apagarse.
    pub shutdown: watch::Receiver<bool>,
    pub connections: Arc<ConnectionTracker>,
}

/// Cuenta las conexiones de streaming vivas para que el apagado pueda esperarlas.
#[derive(Default)]
pub struct ConnectionTracker {
    next_id: AtomicU64,
    live: AtomicUsize,
    drained: Notify,
}

impl ConnectionTracker {
    pub fn enter(self: &Arc<Self>) -> LiveConnection {
        self.live.fetch_add(1, Ordering::AcqRel);
        LiveConnection {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            tracker: Arc::clone(self),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Se resuelve cuando no queda ninguna conexión viva.
    pub async fn drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.live() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Lo mantiene el bucle de una conexión durante toda su vida.
pub struct LiveConnection {
    pub id: u64,
    tracker: Arc<ConnectionTracker>,
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        if self.tracker.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.drained.notify_waiters();
        }
    }
}
