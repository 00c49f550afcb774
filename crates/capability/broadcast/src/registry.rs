use crate::sink::SubscriberSink;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 订阅者 ID，进程内单调递增，不复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// 注册表中的一项（快照中被克隆）。
#[derive(Clone)]
pub struct SubscriberHandle {
    pub id: SubscriberId,
    pub peer: String,
    pub sink: Arc<dyn SubscriberSink>,
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish()
    }
}

/// 当前连接的订阅者集合。
///
/// 接入方注册/注销，广播方只读快照；锁不会跨越任何发送。
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    entries: RwLock<BTreeMap<SubscriberId, SubscriberHandle>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn register(&self, sink: Arc<dyn SubscriberSink>, peer: impl Into<String>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = SubscriberHandle {
            id,
            peer: peer.into(),
            sink,
        };
        self.write().insert(id, handle);
        id
    }

    /// 移除订阅者；已移除时返回 `false`。
    pub fn deregister(&self, id: SubscriberId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// 时点快照，按注册顺序。
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.read().values().cloned().collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // 持锁期间不会 panic，中毒时沿用内部数据。
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<SubscriberId, SubscriberHandle>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<SubscriberId, SubscriberHandle>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;

    fn sink() -> Arc<dyn SubscriberSink> {
        let (sink, _rx) = ChannelSink::channel(1);
        Arc::new(sink)
    }

    #[test]
    fn ids_are_unique_and_snapshot_is_ordered() {
        let registry = SubscriberRegistry::new();
        let a = registry.register(sink(), "10.0.0.1:5000");
        let b = registry.register(sink(), "10.0.0.2:5000");
        assert_ne!(a, b);
        let ids: Vec<SubscriberId> = registry.snapshot().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn deregister_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(sink(), "peer");
        assert!(registry.deregister(id));
        assert!(!registry.deregister(id));
        assert!(registry.is_empty());
        assert!(!registry.contains(id));
    }

    #[test]
    fn snapshot_is_a_copy() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(sink(), "peer");
        let snapshot = registry.snapshot();
        registry.deregister(id);
        assert_eq!(snapshot.len(), 1);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn id_display_is_stable() {
        let registry = SubscriberRegistry::new();
        let id = registry.register(sink(), "peer");
        assert_eq!(id.to_string(), format!("sub-{}", id.get()));
    }
}
