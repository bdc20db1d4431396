// src/db/change_feed.rs

// Canal de alterações compartilhado pelos backends do store. Cada listener é
// uma `Subscription`; soltar a subscription é o "unsubscribe".

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::db::store::{CollectionPath, DocPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub path: DocPath,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    Collection(CollectionPath),
    Document(DocPath),
}

impl WatchTarget {
    pub fn matches(&self, path: &DocPath) -> bool {
        match self {
            WatchTarget::Collection(collection) => &path.parent() == collection,
            WatchTarget::Document(doc) => path == doc,
        }
    }
}

/// O que um listener recebe: uma alteração, ou o aviso de que eventos foram
/// perdidos e o snapshot precisa ser relido por inteiro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Event(ChangeEvent),
    Lagged,
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
    active: Arc<AtomicUsize>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, active: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn publish(&self, path: DocPath, kind: ChangeKind) {
        // Sem receptores o envio falha, e tudo bem.
        let _ = self.tx.send(ChangeEvent { path, kind });
    }

    pub fn watch(&self, target: WatchTarget) -> Subscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        Subscription {
            target,
            rx: self.tx.subscribe(),
            _guard: ListenerGuard(self.active.clone()),
        }
    }

    /// Quantos listeners estão vivos neste momento.
    pub fn active_listeners(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

struct ListenerGuard(Arc<AtomicUsize>);

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Subscription {
    target: WatchTarget,
    rx: broadcast::Receiver<ChangeEvent>,
    _guard: ListenerGuard,
}

impl Subscription {
    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Espera a próxima alteração que casa com o alvo. `None` quando o feed fechou.
    pub async fn changed(&mut self) -> Option<Change> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.target.matches(&event.path) => return Some(Change::Event(event)),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Listener de {:?} perdeu {} eventos.", self.target, skipped);
                    return Some(Change::Lagged);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_only_sees_its_collection() {
        let feed = ChangeFeed::default();
        let clients = CollectionPath::root("users").doc("A").collection("clients");
        let mut sub = feed.watch(WatchTarget::Collection(clients.clone()));

        feed.publish(CollectionPath::root("users").doc("B").collection("clients").doc("x"), ChangeKind::Upserted);
        feed.publish(clients.doc("c1"), ChangeKind::Deleted);

        match sub.changed().await {
            Some(Change::Event(event)) => {
                assert_eq!(event.path, clients.doc("c1"));
                assert_eq!(event.kind, ChangeKind::Deleted);
            }
            other => panic!("evento inesperado: {other:?}"),
        }
    }

    #[test]
    fn dropping_a_subscription_releases_the_listener() {
        let feed = ChangeFeed::default();
        let sub = feed.watch(WatchTarget::Document(CollectionPath::root("users").doc("A")));
        assert_eq!(feed.active_listeners(), 1);
        sub.unsubscribe();
        assert_eq!(feed.active_listeners(), 0);
    }
}
