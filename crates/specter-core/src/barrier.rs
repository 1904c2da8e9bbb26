use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::Notify;

#[derive(Debug)]
struct Inner {
    size: usize,
    remaining: AtomicUsize,
    notify: Notify,
}

/// Contador de trabajos pendientes con una única espera.
///
/// Se crea con un tamaño fijo y entrega exactamente ese número de
/// [`CompletionToken`]. Cada token descuenta una sola vez, al completarse o al
/// soltarse (también si el worker entra en pánico), así que el éxito y el
/// fallo son indistinguibles aquí. [`CompletionBarrier::wait`] consume la
/// barrera: sólo hay un observador.
#[derive(Debug)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

/// Señal terminal de un único trabajo.
#[derive(Debug)]
#[must_use = "dropping a token signals completion immediately"]
pub struct CompletionToken {
    inner: Arc<Inner>,
}

impl CompletionBarrier {
    pub fn new(size: usize) -> (Self, Vec<CompletionToken>) {
        let inner = Arc::new(Inner {
            size,
            remaining: AtomicUsize::new(size),
            notify: Notify::new(),
        });
        let tokens = (0..size)
            .map(|_| CompletionToken {
                inner: inner.clone(),
            })
            .collect();
        (CompletionBarrier { inner }, tokens)
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Espera a que todos los tokens hayan señalizado.
    pub async fn wait(self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl CompletionToken {
    pub fn complete(self) {}
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if self.inner.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.notify.notify_one();
        }
    }
}
