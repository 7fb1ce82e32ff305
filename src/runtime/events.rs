//! Best-effort realtime fan-out of persisted operations.

use hashbrown::HashMap;
use tokio::sync::broadcast;

use crate::{
    operation::{GroupOperation, Operation},
    types::{GroupId, UserId},
};

/// Per-user and per-group broadcast channels.
///
/// Delivery is at-most-once best effort: a send with no live receivers, or
/// to a lagging receiver, is simply dropped. Callers needing durability
/// reconcile through the history queries. Dropping a receiver unsubscribes.
#[derive(Debug)]
pub struct Broadcaster {
    user_channels: HashMap<UserId, broadcast::Sender<Operation>>,
    group_channels: HashMap<GroupId, broadcast::Sender<GroupOperation>>,
    capacity: usize,
}

impl Broadcaster {
    /// Creates a broadcaster whose channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            user_channels: HashMap::new(),
            group_channels: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Opens (or joins) the channel carrying one user's persisted operations.
    pub fn subscribe(&mut self, user_id: &str) -> broadcast::Receiver<Operation> {
        self.user_channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Opens (or joins) the channel carrying one group's projections.
    pub fn subscribe_group(&mut self, group_id: &str) -> broadcast::Receiver<GroupOperation> {
        self.group_channels
            .entry(group_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes a persisted operation to its user's channel.
    pub fn publish(&mut self, op: &Operation) {
        if let Some(tx) = self.user_channels.get(&op.user_id) {
            if tx.send(op.clone()).is_err() {
                self.user_channels.remove(&op.user_id);
            }
        }
    }

    /// Publishes a visible group projection to its group's channel.
    pub fn publish_group(&mut self, group_op: &GroupOperation) {
        if !group_op.is_visible {
            return;
        }
        if let Some(tx) = self.group_channels.get(&group_op.group_id) {
            if tx.send(group_op.clone()).is_err() {
                self.group_channels.remove(&group_op.group_id);
            }
        }
    }
}
