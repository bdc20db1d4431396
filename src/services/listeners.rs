// src/services/listeners.rs

// Listeners em tempo real de uma sessão. Ficam presos ao dono resolvido e às
// coleções liberadas: trocar qualquer um dos dois derruba todos antes de ligar
// os novos.

use std::sync::Arc;

use futures::future::select_all;

use crate::{
    db::{
        change_feed::{Change, Subscription, WatchTarget},
        store::DocumentStore,
    },
    models::scope::TenantScope,
};

#[derive(Default)]
pub struct TenantListeners {
    owner_uid: Option<String>,
    subscriptions: Vec<Subscription>,
}

impl TenantListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner_uid(&self) -> Option<&str> {
        self.owner_uid.as_deref()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    fn targets(&self) -> Vec<&WatchTarget> {
        self.subscriptions.iter().map(|sub| sub.target()).collect()
    }

    /// Liga os alvos no escopo. Mesmo dono e mesmos alvos: nada muda. Do
    /// contrário solta os antigos primeiro. Devolve `true` quando religou.
    pub fn bind(&mut self, store: &Arc<dyn DocumentStore>, scope: &TenantScope, targets: Vec<WatchTarget>) -> bool {
        let same_owner = self.owner_uid.as_deref() == Some(scope.owner_uid());
        if same_owner && self.targets() == targets.iter().collect::<Vec<_>>() {
            return false;
        }
        self.release();

        let feed = store.change_feed();
        self.subscriptions = targets.into_iter().map(|target| feed.watch(target)).collect();
        self.owner_uid = Some(scope.owner_uid().to_string());
        tracing::info!(
            "🔔 {} listeners ligados na oficina {}.",
            self.subscriptions.len(),
            scope.owner_uid()
        );
        true
    }

    /// Solta todos os listeners (logout ou troca de dono).
    pub fn release(&mut self) {
        if !self.subscriptions.is_empty() {
            tracing::debug!("Soltando {} listeners.", self.subscriptions.len());
        }
        self.subscriptions.clear();
        self.owner_uid = None;
    }

    /// Próxima alteração em qualquer alvo. `None` sem listeners ou com o feed fechado.
    pub async fn next_change(&mut self) -> Option<(WatchTarget, Change)> {
        if self.subscriptions.is_empty() {
            return None;
        }
        let pending = self.subscriptions.iter_mut().map(|sub| Box::pin(sub.changed()));
        let (change, index, rest) = select_all(pending).await;
        drop(rest);
        let target = self.subscriptions[index].target().clone();
        change.map(|change| (target, change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fields::Fields;
    use crate::db::{store::SetMode, MemoryDocumentStore};
    use crate::models::records::TenantCollection;

    fn scope(owner: &str) -> TenantScope {
        TenantScope::for_identity(owner, None).unwrap()
    }

    fn targets(scope: &TenantScope) -> Vec<WatchTarget> {
        vec![
            WatchTarget::Collection(scope.collection(TenantCollection::Clients)),
            WatchTarget::Document(scope.settings()),
        ]
    }

    #[test]
    fn rebinding_to_another_owner_drops_previous_listeners() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let mut listeners = TenantListeners::new();

        assert!(listeners.bind(&store, &scope("A"), targets(&scope("A"))));
        assert_eq!(store.change_feed().active_listeners(), 2);

        // Mesmo dono não duplica.
        assert!(!listeners.bind(&store, &scope("A"), targets(&scope("A"))));
        assert_eq!(store.change_feed().active_listeners(), 2);

        assert!(listeners.bind(&store, &scope("B"), targets(&scope("B"))));
        assert_eq!(store.change_feed().active_listeners(), 2);
        assert_eq!(listeners.owner_uid(), Some("B"));

        listeners.release();
        assert_eq!(store.change_feed().active_listeners(), 0);
    }

    #[test]
    fn narrowed_targets_rebind_on_the_same_owner() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let mut listeners = TenantListeners::new();
        let a = scope("A");

        assert!(listeners.bind(&store, &a, targets(&a)));
        assert!(listeners.bind(&store, &a, vec![WatchTarget::Document(a.settings())]));
        assert_eq!(store.change_feed().active_listeners(), 1);
        assert_eq!(listeners.owner_uid(), Some("A"));
    }

    #[tokio::test]
    async fn changes_from_other_tenants_are_not_delivered() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let mut listeners = TenantListeners::new();
        let a = scope("A");
        listeners.bind(&store, &a, targets(&a));

        let b = scope("B");
        store
            .set(&b.record(TenantCollection::Clients, "x"), Fields::new(), SetMode::Replace)
            .await
            .unwrap();
        store
            .set(&a.record(TenantCollection::Clients, "c1"), Fields::new(), SetMode::Replace)
            .await
            .unwrap();

        let (target, change) = listeners.next_change().await.unwrap();
        assert_eq!(target, WatchTarget::Collection(a.collection(TenantCollection::Clients)));
        match change {
            Change::Event(event) => assert_eq!(event.path, a.record(TenantCollection::Clients, "c1")),
            Change::Lagged => panic!("não deveria atrasar"),
        }
    }

    #[tokio::test]
    async fn no_listeners_yields_nothing() {
        let mut listeners = TenantListeners::new();
        assert!(listeners.next_change().await.is_none());
    }
}
