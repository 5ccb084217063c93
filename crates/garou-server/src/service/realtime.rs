use garou_core::LiveBroadcast;
use garou_types::BroadcastPacket;
use tokio::sync::broadcast;

/// Fan-out hub for spectator packets. Sessions publish without blocking;
/// each subscriber reads its own bounded queue and a laggard simply
/// misses packets instead of back-pressuring the game.
#[derive(Clone)]
pub struct RealtimeBroadcaster {
    tx: broadcast::Sender<BroadcastPacket>,
}

impl RealtimeBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastPacket> {
        self.tx.subscribe()
    }
}

impl LiveBroadcast for RealtimeBroadcaster {
    fn emit(&self, packet: BroadcastPacket) {
        let _ = self.tx.send(packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(idx: u64) -> BroadcastPacket {
        BroadcastPacket {
            id: "g1".into(),
            idx,
            day: 0,
            is_day: true,
            event: "talk".into(),
            from_idx: None,
            to_idx: None,
            bubble_idx: None,
            message: None,
            agents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn subscribers_see_packets_in_emission_order() {
        let hub = RealtimeBroadcaster::new(16);
        let mut rx = hub.subscribe();
        hub.emit(packet(1));
        hub.emit(packet(2));
        assert_eq!(rx.recv().await.unwrap().idx, 1);
        assert_eq!(rx.recv().await.unwrap().idx, 2);
    }

    #[tokio::test]
    async fn emitting_without_subscribers_is_fine() {
        let hub = RealtimeBroadcaster::new(16);
        hub.emit(packet(1));
    }
}
