// src/services/session_signals.rs

// Avisa as conexões abertas de um usuário (streams SSE) que a sessão ou o
// acesso dele mudou: logout, troca de senha, permissões alteradas ou técnico
// removido. Quem recebe o aviso revalida o token e o contexto.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

#[derive(Clone, Default)]
pub struct SessionSignals {
    senders: Arc<Mutex<HashMap<String, watch::Sender<u64>>>>,
}

impl SessionSignals {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<u64>>> {
        // Lock envenenado: segue com o estado que ficou.
        match self.senders.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Receptor que acorda a cada `notify` do usuário.
    pub fn subscribe(&self, uid: &str) -> watch::Receiver<u64> {
        let mut senders = self.lock();
        // Usuários sem nenhuma conexão aberta saem do mapa.
        senders.retain(|_, sender| sender.receiver_count() > 0);
        senders
            .entry(uid.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    pub fn notify(&self, uid: &str) {
        let senders = self.lock();
        if let Some(sender) = senders.get(uid) {
            sender.send_modify(|generation| *generation += 1);
            tracing::debug!("Sessão de {} sinalizada para {} conexões.", uid, sender.receiver_count());
        }
    }

    /// Usuários com conexões abertas.
    pub fn watched(&self) -> usize {
        self.lock().values().filter(|sender| sender.receiver_count() > 0).count()
    }
}
