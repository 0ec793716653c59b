use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::broadcast::{self, Receiver, Sender};

const CHANNEL_CAPACITY: usize = 256;

static EVENTS: OnceLock<Sender<ChangeEvent>> = OnceLock::new();

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Report,
    Team,
    Staff,
    Notification,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, id: &ObjectId) -> Self {
        ChangeEvent {
            kind,
            id: id.to_hex(),
        }
    }
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: change\ndata: {data}\n\n")
    }
}

fn sender() -> &'static Sender<ChangeEvent> {
    EVENTS.get_or_init(|| broadcast::channel(CHANNEL_CAPACITY).0)
}

/// Nobody listening is not an error; the event is simply dropped.
pub fn publish(event: ChangeEvent) {
    let _ = sender().send(event);
}

pub fn subscribe() -> Receiver<ChangeEvent> {
    sender().subscribe()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_server_sent_event() {
        let id = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        let event = ChangeEvent::new(ChangeKind::Report, &id);
        assert_eq!(
            event.to_sse(),
            "event: change\ndata: {\"kind\":\"report\",\"id\":\"65a1b2c3d4e5f60718293a4b\"}\n\n"
        );
    }

    #[actix_web::test]
    async fn subscribers_receive_published_events() {
        let mut receiver = subscribe();
        let id = ObjectId::new();
        publish(ChangeEvent::new(ChangeKind::Team, &id));

        let mut found = false;
        while let Ok(event) = receiver.try_recv() {
            if event.id == id.to_hex() {
                assert_eq!(event.kind, ChangeKind::Team);
                found = true;
            }
        }
        assert!(found);
    }
}
