// ==========================================
// 巡逻排班系统 - 快照缓存
// ==========================================
// 状态机: Unloaded → Loading → Ready
// - ensure_loaded: 无锁检查 → 加锁 → 二次检查 → 加载（防缓存击穿）
// - load: 强制重新加载
// - refresh: 标记过期 + 重新加载
// 新快照在锁外完整构建，只在最后一步整体替换
// 加载失败: 状态回到 Unloaded，旧快照保持可见，错误返回调用方
// 发布钩子在替换完成后调用（此时读者已能看到新快照）
// ==========================================

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// 数据集加载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
}

impl LoadState {
    fn as_u8(self) -> u8 {
        match self {
            LoadState::Unloaded => 0,
            LoadState::Loading => 1,
            LoadState::Ready => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => LoadState::Loading,
            2 => LoadState::Ready,
            _ => LoadState::Unloaded,
        }
    }
}

/// 单个数据集的快照缓存
///
/// 每个数据集独占一把加载锁，不同数据集可并发加载
pub struct SnapshotCache<T> {
    name: &'static str,
    state: AtomicU8,
    load_lock: Mutex<()>,
    current: RwLock<Option<Arc<T>>>,
    loads: AtomicU64,
    on_published: Option<PublishHook<T>>,
}

type PublishHook<T> = Box<dyn Fn(&T) + Send + Sync>;

impl<T> SnapshotCache<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(LoadState::Unloaded.as_u8()),
            load_lock: Mutex::new(()),
            current: RwLock::new(None),
            loads: AtomicU64::new(0),
            on_published: None,
        }
    }

    /// 注册新快照发布后的回调
    pub fn on_published(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_published = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 成功加载次数
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Acquire)
    }

    /// 当前快照（可能已过期）
    pub fn snapshot(&self) -> Option<Arc<T>> {
        match self.current.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 确保至少加载过一次
    pub async fn ensure_loaded<F, Fut, E>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(snapshot) = self.ready_snapshot() {
            return Ok(snapshot);
        }

        let _guard = self.load_lock.lock().await;

        // 二次检查: 等锁期间可能已由其他调用方加载完成
        if let Some(snapshot) = self.ready_snapshot() {
            return Ok(snapshot);
        }

        self.run_load(load).await
    }

    /// 强制重新加载
    pub async fn load<F, Fut, E>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _guard = self.load_lock.lock().await;
        self.run_load(load).await
    }

    /// 标记过期并重新加载
    pub async fn refresh<F, Fut, E>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.invalidate();
        self.load(load).await
    }

    /// 标记过期（旧快照保持可见，下次 ensure_loaded 时重新加载）
    pub fn invalidate(&self) {
        let _ = self.state.compare_exchange(
            LoadState::Ready.as_u8(),
            LoadState::Unloaded.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        tracing::debug!("缓存 {} 已标记过期", self.name);
    }

    fn ready_snapshot(&self) -> Option<Arc<T>> {
        if self.state() == LoadState::Ready {
            self.snapshot()
        } else {
            None
        }
    }

    // 调用方必须持有 load_lock
    async fn run_load<F, Fut, E>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.state
            .store(LoadState::Loading.as_u8(), Ordering::Release);

        match load().await {
            Ok(value) => {
                let snapshot = Arc::new(value);
                match self.current.write() {
                    Ok(mut slot) => *slot = Some(snapshot.clone()),
                    Err(poisoned) => *poisoned.into_inner() = Some(snapshot.clone()),
                }
                self.loads.fetch_add(1, Ordering::AcqRel);
                self.state.store(LoadState::Ready.as_u8(), Ordering::Release);
                tracing::debug!("缓存 {} 已加载新快照", self.name);
                if let Some(hook) = &self.on_published {
                    hook(&snapshot);
                }
                Ok(snapshot)
            }
            Err(e) => {
                self.state
                    .store(LoadState::Unloaded.as_u8(), Ordering::Release);
                tracing::warn!("缓存 {} 加载失败，保留旧快照", self.name);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_loaded_loads_once() {
        let cache = Arc::new(SnapshotCache::<Vec<u32>>::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .ensure_loaded(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok::<_, String>(vec![1, 2, 3])
                    })
                    .await
            }));
        }

        let results: Vec<Arc<Vec<u32>>> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.load_count(), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(*results[0], vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_snapshot() {
        let cache = SnapshotCache::<u32>::new("test");
        cache.ensure_loaded(|| async { Ok::<_, String>(1) }).await.unwrap();

        let err = cache
            .load(|| async { Err::<u32, _>("broken".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "broken");
        assert_eq!(cache.state(), LoadState::Unloaded);
        assert_eq!(cache.snapshot().as_deref(), Some(&1));

        // 未就绪: 下一次 ensure_loaded 重新加载
        let value = cache.ensure_loaded(|| async { Ok::<_, String>(2) }).await.unwrap();
        assert_eq!(*value, 2);
    }

    #[tokio::test]
    async fn test_first_load_failure_leaves_cache_empty() {
        let cache = SnapshotCache::<u32>::new("test");
        assert!(cache
            .ensure_loaded(|| async { Err::<u32, _>("nope") })
            .await
            .is_err());
        assert!(cache.snapshot().is_none());
        assert_eq!(cache.load_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_hook_sees_swapped_snapshot() {
        let published = Arc::new(AtomicUsize::new(0));
        let seen = published.clone();
        let cache = SnapshotCache::<u32>::new("test").on_published(move |value| {
            seen.fetch_add(*value as usize, Ordering::SeqCst);
        });

        cache.load(|| async { Ok::<_, String>(3) }).await.unwrap();
        let _ = cache.load(|| async { Err::<u32, _>("x".to_string()) }).await;
        cache.ensure_loaded(|| async { Ok::<_, String>(4) }).await.unwrap();

        assert_eq!(published.load(Ordering::SeqCst), 3 + 4);
    }

    #[tokio::test]
    async fn test_invalidate_and_refresh() {
        let cache = SnapshotCache::<u32>::new("test");
        cache.ensure_loaded(|| async { Ok::<_, String>(1) }).await.unwrap();

        cache.invalidate();
        assert_eq!(cache.state(), LoadState::Unloaded);
        assert_eq!(cache.snapshot().as_deref(), Some(&1));

        let refreshed = cache.refresh(|| async { Ok::<_, String>(5) }).await.unwrap();
        assert_eq!(*refreshed, 5);
        assert_eq!(cache.state(), LoadState::Ready);
        assert_eq!(cache.load_count(), 2);

        // 已就绪: 不再调用加载函数
        let same = cache
            .ensure_loaded(|| async { Err::<u32, _>("不应被调用".to_string()) })
            .await
            .unwrap();
        assert_eq!(*same, 5);
    }
}
