//! Partitioned publish/subscribe hub for domain events.
//!
//! Observers subscribe to one tournament (or to the lobby) and get their own
//! bounded buffer. Publishing never waits: an observer whose buffer is full
//! misses the event and is disconnected, the others are unaffected.

use std::{
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::messages::DomainEvent;
use crate::tournament::TournamentId;

/// Default per-observer buffer size
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Observer ID type
pub type ObserverId = u64;

/// Subscription partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Tournament lifecycle events for every tournament
    Lobby,
    /// All events of one tournament
    Tournament(TournamentId),
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Observers that missed the event and were disconnected
    pub dropped: usize,
}

/// Running totals since the hub was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
}

type Partition = HashMap<ObserverId, mpsc::Sender<Arc<DomainEvent>>>;

struct HubInner {
    partitions: RwLock<HashMap<Topic, Partition>>,
    next_id: AtomicU64,
    buffer_size: usize,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl HubInner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Topic, Partition>> {
        self.partitions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Topic, Partition>> {
        self.partitions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, topic: Topic, id: ObserverId) -> bool {
        remove_observer(&mut self.write(), topic, id)
    }
}

fn remove_observer(partitions: &mut HashMap<Topic, Partition>, topic: Topic, id: ObserverId) -> bool {
    let Some(observers) = partitions.get_mut(&topic) else {
        return false;
    };
    let removed = observers.remove(&id).is_some();
    if observers.is_empty() {
        partitions.remove(&topic);
    }
    removed
}

/// Event fan-out hub. Cloning shares the same subscriber set.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl EventHub {
    /// Create a hub whose observers buffer up to `buffer_size` events
    pub fn new(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                partitions: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer_size: buffer_size.max(1),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Observe every event of one tournament
    pub fn subscribe(&self, tournament_id: TournamentId) -> ObserverHandle {
        self.subscribe_topic(Topic::Tournament(tournament_id))
    }

    /// Observe tournament creation, updates and deletion across all tournaments
    pub fn subscribe_lobby(&self) -> ObserverHandle {
        self.subscribe_topic(Topic::Lobby)
    }

    fn subscribe_topic(&self, topic: Topic) -> ObserverHandle {
        let (sender, receiver) = mpsc::channel(self.inner.buffer_size);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .write()
            .entry(topic)
            .or_default()
            .insert(id, sender);

        log::debug!("Observer {} subscribed to {:?}", id, topic);

        ObserverHandle {
            id,
            topic,
            receiver,
            hub: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Deliver `event` to the observers of its tournament, and to the lobby
    /// when it is a tournament lifecycle event. Never blocks.
    pub fn publish(&self, event: DomainEvent) -> PublishReport {
        let event = Arc::new(event);
        let targets = [
            Some(Topic::Tournament(event.tournament_id())),
            event.is_lobby_event().then_some(Topic::Lobby),
        ];

        let mut report = PublishReport::default();
        let mut failed = Vec::new();
        {
            let partitions = self.inner.read();
            for topic in targets.into_iter().flatten() {
                let Some(observers) = partitions.get(&topic) else {
                    continue;
                };
                for (id, sender) in observers {
                    match sender.try_send(Arc::clone(&event)) {
                        Ok(()) => report.delivered += 1,
                        Err(TrySendError::Full(_)) => {
                            log::warn!(
                                "Observer {} buffer full, dropping {} and disconnecting",
                                id,
                                event.event_type()
                            );
                            report.dropped += 1;
                            failed.push((topic, *id));
                        }
                        Err(TrySendError::Closed(_)) => {
                            log::debug!("Observer {} disconnected, removing", id);
                            failed.push((topic, *id));
                        }
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut partitions = self.inner.write();
            for (topic, id) in failed {
                remove_observer(&mut partitions, topic, id);
            }
        }

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.inner
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.inner
            .dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);

        report
    }

    /// Disconnect every observer of a tournament. Returns how many were removed.
    pub fn close_partition(&self, tournament_id: TournamentId) -> usize {
        let removed = self
            .inner
            .write()
            .remove(&Topic::Tournament(tournament_id))
            .map_or(0, |observers| observers.len());
        if removed > 0 {
            log::debug!(
                "Closed {} observers of tournament {}",
                removed,
                tournament_id
            );
        }
        removed
    }

    pub fn subscriber_count(&self, tournament_id: TournamentId) -> usize {
        self.topic_count(Topic::Tournament(tournament_id))
    }

    pub fn lobby_subscriber_count(&self) -> usize {
        self.topic_count(Topic::Lobby)
    }

    fn topic_count(&self, topic: Topic) -> usize {
        self.inner.read().get(&topic).map_or(0, HashMap::len)
    }

    /// Number of partitions that currently have observers
    pub fn partition_count(&self) -> usize {
        self.inner.read().len()
    }

    /// Total observers across all partitions
    pub fn observer_count(&self) -> usize {
        self.inner.read().values().map(HashMap::len).sum()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            published: self.inner.published.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Receiving side of a subscription. Dropping it unsubscribes.
pub struct ObserverHandle {
    id: ObserverId,
    topic: Topic,
    receiver: mpsc::Receiver<Arc<DomainEvent>>,
    hub: Weak<HubInner>,
    active: bool,
}

impl ObserverHandle {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Wait for the next event
    ///
    /// Returns `None` once unsubscribed, or after the hub disconnected this
    /// observer and the events buffered before that were drained.
    pub async fn recv(&mut self) -> Option<Arc<DomainEvent>> {
        if !self.active {
            return None;
        }
        self.receiver.recv().await
    }

    /// Take the next buffered event without waiting
    pub fn try_recv(&mut self) -> Option<Arc<DomainEvent>> {
        if !self.active {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Stop receiving events. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(hub) = self.hub.upgrade()
            && hub.remove(self.topic, self.id)
        {
            log::debug!("Observer {} unsubscribed from {:?}", self.id, self.topic);
        }
        self.receiver.close();
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registered(tournament_id: TournamentId, name: &str) -> DomainEvent {
        DomainEvent::TeamRegistered {
            tournament_id,
            team_id: Uuid::new_v4(),
            team_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fan_out_to_all_observers() {
        let hub = EventHub::new(8);
        let t = Uuid::new_v4();
        let mut a = hub.subscribe(t);
        let mut b = hub.subscribe(t);

        let report = hub.publish(registered(t, "Owls"));
        assert_eq!(report, PublishReport { delivered: 2, dropped: 0 });

        for observer in [&mut a, &mut b] {
            let event = observer.recv().await.unwrap();
            assert_eq!(event.event_type(), "team_registered");
        }
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let hub = EventHub::new(8);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let mut watching_t1 = hub.subscribe(t1);
        let mut watching_t2 = hub.subscribe(t2);

        hub.publish(registered(t1, "Owls"));

        assert!(watching_t1.try_recv().is_some());
        assert!(watching_t2.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_saturated_observer_does_not_block_others() {
        let hub = EventHub::new(1);
        let t = Uuid::new_v4();
        let mut slow = hub.subscribe(t);
        let mut fast = hub.subscribe(t);

        hub.publish(registered(t, "first"));
        assert!(fast.try_recv().is_some());

        // slow never read, so its single slot is still taken
        let report = hub.publish(registered(t, "second"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert!(fast.try_recv().is_some());
        assert_eq!(hub.subscriber_count(t), 1);

        // slow drains what it had, then sees the end of the stream
        assert!(slow.recv().await.is_some());
        assert!(slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_releases_partition() {
        let hub = EventHub::new(4);
        let t = Uuid::new_v4();
        let mut observer = hub.subscribe(t);
        assert_eq!(hub.partition_count(), 1);

        observer.unsubscribe();
        observer.unsubscribe();
        assert_eq!(hub.subscriber_count(t), 0);
        assert_eq!(hub.partition_count(), 0);

        hub.publish(registered(t, "late"));
        assert!(observer.recv().await.is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = EventHub::new(4);
        let t = Uuid::new_v4();
        {
            let _observer = hub.subscribe(t);
            assert_eq!(hub.subscriber_count(t), 1);
        }
        assert_eq!(hub.subscriber_count(t), 0);
        assert_eq!(hub.observer_count(), 0);
    }

    #[test]
    fn test_lobby_receives_lifecycle_events_only() {
        let hub = EventHub::new(4);
        let t = Uuid::new_v4();
        let mut lobby = hub.subscribe_lobby();

        hub.publish(registered(t, "Owls"));
        assert!(lobby.try_recv().is_none());

        hub.publish(DomainEvent::TournamentDeleted { tournament_id: t });
        let event = lobby.try_recv().unwrap();
        assert_eq!(event.tournament_id(), t);
        assert_eq!(hub.lobby_subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_close_partition_ends_streams() {
        let hub = EventHub::new(4);
        let t = Uuid::new_v4();
        let mut a = hub.subscribe(t);
        let _b = hub.subscribe(t);

        assert_eq!(hub.close_partition(t), 2);
        assert_eq!(hub.subscriber_count(t), 0);
        assert!(a.recv().await.is_none());
    }

    #[test]
    fn test_stats_accumulate() {
        let hub = EventHub::new(1);
        let t = Uuid::new_v4();
        let _observer = hub.subscribe(t);

        hub.publish(registered(t, "one"));
        hub.publish(registered(t, "two"));
        hub.publish(registered(t, "three"));

        let stats = hub.stats();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_zero_buffer_is_clamped() {
        assert_eq!(EventHub::new(0).buffer_size(), 1);
    }
}
