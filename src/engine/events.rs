// ==========================================
// 巡逻排班系统 - 数据集变更通知
// ==========================================
// 职责: 按数据集键订阅/发布变更信号（不携带数据）
// 说明: 通知器显式注入加载器与提交路径，不使用进程级单例总线
// 消费者收到信号后自行重新拉取受影响的数据集
// ==========================================

use crate::cache::LoadState;
use crate::loader::DatasetLoader;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

// ==========================================
// 数据集键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKey {
    /// 数据源已打开
    SourceOpened,
    /// 船员名册（含证书）
    Roster,
    /// 船艇
    Vessels,
    /// 各类别岗位需求
    CrewRoles,
    /// 月度值班表（加载或提交写入后）
    DutySchedule,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 5] = [
        DatasetKey::SourceOpened,
        DatasetKey::Roster,
        DatasetKey::Vessels,
        DatasetKey::CrewRoles,
        DatasetKey::DutySchedule,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DatasetKey::SourceOpened => "SourceOpened",
            DatasetKey::Roster => "Roster",
            DatasetKey::Vessels => "Vessels",
            DatasetKey::CrewRoles => "CrewRoles",
            DatasetKey::DutySchedule => "DutySchedule",
        }
    }
}

// ==========================================
// 监听者 Trait
// ==========================================

/// 数据集变更监听者
///
/// 在发布者所在线程同步调用，实现方不应阻塞
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, key: DatasetKey);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    keys: HashSet<DatasetKey>,
    listener: Arc<dyn ChangeListener>,
}

// ==========================================
// ChangeNotifier
// ==========================================
#[derive(Default)]
pub struct ChangeNotifier {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅指定数据集键
    ///
    /// # 参数
    /// - `keys`: 关注的数据集（为空时不会收到任何通知）
    /// - `listener`: 监听者
    ///
    /// # 返回
    /// 订阅 id，用于 unsubscribe
    pub fn subscribe(
        &self,
        keys: &[DatasetKey],
        listener: Arc<dyn ChangeListener>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Subscription {
            id,
            keys: keys.iter().copied().collect(),
            listener,
        };
        match self.subscriptions.write() {
            Ok(mut subs) => subs.push(subscription),
            Err(poisoned) => poisoned.into_inner().push(subscription),
        }
        id
    }

    /// 取消订阅，返回是否存在该订阅
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = match self.subscriptions.write() {
            Ok(subs) => subs,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// 发布变更信号
    ///
    /// 监听者在锁外调用，监听者内部可再次订阅或发布
    pub fn publish(&self, key: DatasetKey) {
        let listeners: Vec<Arc<dyn ChangeListener>> = {
            let subs = match self.subscriptions.read() {
                Ok(subs) => subs,
                Err(poisoned) => poisoned.into_inner(),
            };
            subs.iter()
                .filter(|s| s.keys.contains(&key))
                .map(|s| s.listener.clone())
                .collect()
        };

        tracing::debug!("发布变更: {} ({} 个监听者)", key.as_str(), listeners.len());
        for listener in listeners {
            listener.on_change(key);
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().map(|s| s.len()).unwrap_or(0)
    }
}

// ==========================================
// CacheInvalidator - 上游变更时标记缓存过期
// ==========================================
// 弱引用目标加载器，避免 通知器 → 监听者 → 加载器 → 通知器 的引用环
pub struct CacheInvalidator {
    target: Weak<dyn DatasetLoader>,
}

impl CacheInvalidator {
    pub fn new(target: &Arc<dyn DatasetLoader>) -> Self {
        Self {
            target: Arc::downgrade(target),
        }
    }
}

impl ChangeListener for CacheInvalidator {
    fn on_change(&self, key: DatasetKey) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        // 加载中的数据集不打断，由其自身完成后发布
        if target.state() == LoadState::Ready {
            target.invalidate();
            tracing::info!(
                "{} 变更，{} 缓存已标记过期",
                key.as_str(),
                target.key().as_str()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<DatasetKey>>,
    }

    impl ChangeListener for Recorder {
        fn on_change(&self, key: DatasetKey) {
            self.seen.lock().unwrap().push(key);
        }
    }

    #[test]
    fn test_publish_reaches_only_interested_listeners() {
        let notifier = ChangeNotifier::new();
        let roster = Arc::new(Recorder::default());
        let schedule = Arc::new(Recorder::default());

        notifier.subscribe(&[DatasetKey::Roster], roster.clone());
        notifier.subscribe(
            &[DatasetKey::DutySchedule, DatasetKey::SourceOpened],
            schedule.clone(),
        );

        notifier.publish(DatasetKey::DutySchedule);
        notifier.publish(DatasetKey::Vessels);
        notifier.publish(DatasetKey::Roster);

        assert_eq!(*roster.seen.lock().unwrap(), vec![DatasetKey::Roster]);
        assert_eq!(*schedule.seen.lock().unwrap(), vec![DatasetKey::DutySchedule]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = ChangeNotifier::new();
        let recorder = Arc::new(Recorder::default());
        let id = notifier.subscribe(&DatasetKey::ALL, recorder.clone());

        notifier.publish(DatasetKey::Vessels);
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.publish(DatasetKey::Vessels);

        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
        assert_eq!(notifier.subscription_count(), 0);
    }
}
