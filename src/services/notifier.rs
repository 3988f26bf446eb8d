// src/services/notifier.rs

use tokio::sync::broadcast;

use crate::models::cash_session::{CashOpening, OpeningEvent};

/// Canal push das transições de abertura de caixa.
/// Perde eventos se o assinante atrasar; o cliente relê o estado atual ao reconectar.
#[derive(Clone)]
pub struct OpeningNotifier {
    sender: broadcast::Sender<OpeningEvent>,
}

impl OpeningNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OpeningEvent> {
        self.sender.subscribe()
    }

    /// Publica o novo estado. Sem assinantes não é erro.
    pub fn publish(&self, opening: &CashOpening) {
        let event = OpeningEvent::from(opening);
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(
                "Abertura {} -> {:?} ({} assinantes)",
                opening.id,
                opening.status,
                receivers
            ),
            Err(_) => tracing::trace!("Abertura {} sem assinantes", opening.id),
        }
    }
}
