use openpenpal_models::realtime::{RealtimePayload, RoomId};
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{instrument, warn};
use uuid::Uuid;

const OUTBOUND_QUEUE_CAPACITY: usize = 64;
const SLOW_CONSUMER_TIMEOUT: Duration = Duration::from_millis(50);

/// Opaque handle for one connected WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(Uuid);

impl ConnId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Connection {
    sender: mpsc::Sender<RealtimePayload>,
    rooms: HashSet<RoomId>,
}

/// Room-keyed fanout hub (spec §4.7/§5): one lock guards room membership,
/// each connection gets its own bounded outbound queue so a slow consumer
/// never backs up delivery to the rest of its rooms. Publish pushes with a
/// short timeout and disconnects whoever can't keep up, per the
/// "slowest-consumer connection is closed" rule.
pub struct Hub {
    connections: RwLock<HashMap<ConnId, Connection>>,
    rooms: RwLock<HashMap<RoomId, HashSet<ConnId>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self { connections: RwLock::new(HashMap::new()), rooms: RwLock::new(HashMap::new()) }
    }

    /// Registers a new connection and returns its id plus the receiving
    /// end of its outbound queue; the caller drives the WebSocket writer.
    pub async fn connect(&self) -> (ConnId, mpsc::Receiver<RealtimePayload>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let id = ConnId::new();
        self.connections.write().await.insert(id, Connection { sender, rooms: HashSet::new() });
        (id, receiver)
    }

    pub async fn disconnect(&self, conn: ConnId) {
        let rooms = self.connections.write().await.remove(&conn).map(|c| c.rooms).unwrap_or_default();
        let mut rooms_guard = self.rooms.write().await;
        for room in rooms {
            if let Some(members) = rooms_guard.get_mut(&room) {
                members.remove(&conn);
                if members.is_empty() {
                    rooms_guard.remove(&room);
                }
            }
        }
    }

    pub async fn subscribe(&self, conn: ConnId, room: RoomId) {
        {
            let mut conns = self.connections.write().await;
            match conns.get_mut(&conn) {
                Some(c) => {
                    c.rooms.insert(room.clone());
                }
                None => return,
            }
        }
        self.rooms.write().await.entry(room).or_default().insert(conn);
    }

    pub async fn unsubscribe(&self, conn: ConnId, room: &RoomId) {
        if let Some(c) = self.connections.write().await.get_mut(&conn) {
            c.rooms.remove(room);
        }
        if let Some(members) = self.rooms.write().await.get_mut(room) {
            members.remove(&conn);
        }
    }

    /// Fans a payload out to every member of `room`. Ordering is preserved
    /// per publisher per room since members are pushed to sequentially
    /// under a shared read lock; no cross-room ordering is implied.
    #[instrument(skip(self, payload))]
    pub async fn publish(&self, room: RoomId, payload: RealtimePayload) {
        let members: Vec<ConnId> = match self.rooms.read().await.get(&room) {
            Some(set) => set.iter().copied().collect(),
            None => return,
        };

        let mut slow_consumers = Vec::new();
        {
            let conns = self.connections.read().await;
            for conn in &members {
                let Some(connection) = conns.get(conn) else { continue };
                match timeout(SLOW_CONSUMER_TIMEOUT, connection.sender.send(payload.clone())).await {
                    Ok(Ok(())) => {}
                    _ => slow_consumers.push(*conn),
                }
            }
        }

        for conn in slow_consumers {
            warn!(%conn, room = %room.0, "closing slow consumer");
            self.disconnect(conn).await;
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RealtimePayload {
        RealtimePayload::NotificationNew { title: "hi".into(), body: "there".into() }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = Hub::new();
        let (conn, mut rx) = hub.connect().await;
        let room = RoomId::admin_broadcast();
        hub.subscribe(conn, room.clone()).await;

        hub.publish(room, payload()).await;

        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn publish_to_empty_room_is_a_noop() {
        let hub = Hub::new();
        hub.publish(RoomId::admin_broadcast(), payload()).await;
    }

    #[tokio::test]
    async fn disconnect_removes_room_membership() {
        let hub = Hub::new();
        let (conn, _rx) = hub.connect().await;
        let room = RoomId::admin_broadcast();
        hub.subscribe(conn, room.clone()).await;
        hub.disconnect(conn).await;

        let (_other, mut other_rx) = hub.connect().await;
        hub.publish(room, payload()).await;
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_further_delivery() {
        let hub = Hub::new();
        let (conn, mut rx) = hub.connect().await;
        let room = RoomId::admin_broadcast();
        hub.subscribe(conn, room.clone()).await;
        hub.unsubscribe(conn, &room).await;

        hub.publish(room, payload()).await;
        assert!(rx.try_recv().is_err());
    }
}
