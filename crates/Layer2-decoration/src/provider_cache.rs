//! ProviderCache - Provider 하나의 데코레이션 캐시
//!
//! 리소스별 상태:
//!
//! ```text
//!   Unknown ──fetch──▶ Pending ──resolve──▶ Settled(Some | None)
//!      ▲                  │                      │
//!      └──── 실패 ────────┘                      │
//!      └──────────── flush / dispose ────────────┘
//! ```
//!
//! 같은 리소스를 다시 요청하면 기존 Pending은 취소되고, 완료 시점에
//! 자기 티켓이 여전히 현재 항목일 때만 결과가 반영됩니다.

use crate::types::{Decoration, DecorationFuture, DecorationProvider, ProviderChange, Provision};
use decor_foundation::{Disposable, Error, ResourceId, ResourceTrie, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

// ============================================================================
// Cache Entry
// ============================================================================

/// 진행 중인 요청
#[derive(Debug)]
pub struct PendingRequest {
    ticket: u64,
    token: CancellationToken,
}

/// 캐시 항목 (항목 없음 = Unknown)
#[derive(Debug)]
pub enum CacheEntry {
    Pending(PendingRequest),

    /// 결정됨 (None = 데코레이션 없음으로 확정)
    Settled(Option<Decoration>),
}

/// 외부에 보여주는 항목 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Unknown,
    Pending,
    Absent,
    Present(Decoration),
}

/// 캐시가 내보내는 변경
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheChange {
    /// 특정 리소스 값이 바뀜
    Resource(ResourceId),

    /// 캐시 전체가 비워짐
    Flush,
}

/// 변경 수신 함수
pub type ChangeSink = Arc<dyn Fn(CacheChange) + Send + Sync>;

// ============================================================================
// ProviderCache
// ============================================================================

/// Provider 하나를 감싸는 계층형 캐시
pub struct ProviderCache {
    inner: Arc<CacheInner>,

    /// Provider 변경 알림 구독
    subscription: Disposable,
}

struct CacheInner {
    provider: Arc<dyn DecorationProvider>,
    data: Mutex<ResourceTrie<CacheEntry>>,
    tickets: AtomicU64,
    sink: ChangeSink,
}

impl ProviderCache {
    /// Provider를 감싸고 변경 알림을 구독
    pub fn new(provider: Arc<dyn DecorationProvider>, sink: ChangeSink) -> Self {
        let inner = Arc::new(CacheInner {
            provider: Arc::clone(&provider),
            data: Mutex::new(ResourceTrie::new()),
            tickets: AtomicU64::new(0),
            sink,
        });

        let weak = Arc::downgrade(&inner);
        let subscription = provider.on_change().subscribe(move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.on_provider_change(change);
            }
        });

        debug!(provider = provider.label(), "Provider cache created");

        Self {
            inner,
            subscription,
        }
    }

    /// Provider 라벨
    pub fn label(&self) -> &str {
        self.inner.provider.label()
    }

    /// 캐시 항목 수 (Pending 포함)
    pub fn len(&self) -> usize {
        self.inner.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 리소스 항목 상태
    pub fn state(&self, id: &ResourceId) -> EntryState {
        match self.inner.data.lock().get(id) {
            None => EntryState::Unknown,
            Some(CacheEntry::Pending(_)) => EntryState::Pending,
            Some(CacheEntry::Settled(None)) => EntryState::Absent,
            Some(CacheEntry::Settled(Some(decoration))) => EntryState::Present(decoration.clone()),
        }
    }

    /// Provider에 요청 (기존 Pending은 취소)
    ///
    /// 즉시 결정되면 결과를, 비동기면 None을 반환합니다.
    pub fn fetch(&self, id: &ResourceId) -> Option<Decoration> {
        self.inner.fetch(id)
    }

    /// 조회 (Unknown이면 요청을 시작)
    ///
    /// `emit(decoration, is_child)`는 정확히 일치하는 항목에 대해 먼저,
    /// `include_children`이면 이미 캐시된 하위 항목 각각에 대해 호출됩니다.
    /// 하위 리소스에 대해서는 요청을 시작하지 않습니다.
    pub fn get_or_retrieve(
        &self,
        id: &ResourceId,
        include_children: bool,
        mut emit: impl FnMut(&Decoration, bool),
    ) {
        let known = self.inner.data.lock().contains(id);
        if !known {
            self.inner.fetch(id);
        }

        // 락을 놓은 뒤 emit 호출
        let (own, descendants) = {
            let data = self.inner.data.lock();
            let own = match data.get(id) {
                Some(CacheEntry::Settled(Some(decoration))) => Some(decoration.clone()),
                _ => None,
            };
            let descendants = if include_children {
                data.find_descendants(id)
                    .filter_map(|(_, entry)| match entry {
                        CacheEntry::Settled(Some(decoration)) => Some(decoration.clone()),
                        _ => None,
                    })
                    .collect()
            } else {
                Vec::new()
            };
            (own, descendants)
        };

        if let Some(decoration) = &own {
            emit(decoration, false);
        }
        for decoration in &descendants {
            emit(decoration, true);
        }
    }

    /// 리소스 자신이나 하위에 대해 항목(상태 무관)이 있는지
    pub fn knows_about(&self, id: &ResourceId) -> bool {
        self.inner.data.lock().knows_about(id)
    }

    /// 구독을 끊고 캐시 내용을 넘겨줌 (Pending은 취소하지 않고 버림)
    pub fn withdraw(&self) -> ResourceTrie<CacheEntry> {
        self.subscription.dispose();
        let withdrawn = std::mem::take(&mut *self.inner.data.lock());
        debug!(
            provider = self.label(),
            entries = withdrawn.len(),
            "Provider cache withdrawn"
        );
        withdrawn
    }

    /// 해제
    pub fn dispose(&self) {
        drop(self.withdraw());
    }
}

impl Drop for ProviderCache {
    fn drop(&mut self) {
        self.subscription.dispose();
    }
}

impl fmt::Debug for ProviderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCache")
            .field("provider", &self.label())
            .field("entries", &self.len())
            .finish()
    }
}

// ============================================================================
// 내부 구현
// ============================================================================

impl CacheInner {
    fn label(&self) -> &str {
        self.provider.label()
    }

    fn fetch(self: &Arc<Self>, id: &ResourceId) -> Option<Decoration> {
        // 1. 기존 Pending 취소
        {
            let mut data = self.data.lock();
            let superseded = match data.get(id) {
                Some(CacheEntry::Pending(pending)) => Some(pending.token.clone()),
                _ => None,
            };
            if let Some(token) = superseded {
                token.cancel();
                data.delete(id);
                trace!(provider = self.label(), resource = %id, "Cancelled superseded request");
            }
        }

        // 2. Provider 호출 (락 없이)
        let token = CancellationToken::new();
        match self.provider.provide_decorations(id, token.clone()) {
            Ok(Provision::Ready(decoration)) => self.settle(id, decoration),
            Ok(Provision::Deferred(future)) => {
                self.install_pending(id, token, future);
                None
            }
            Err(e) => {
                self.report_failure(id, &e);
                None
            }
        }
    }

    fn report_failure(&self, id: &ResourceId, error: &Error) {
        if !error.is_cancelled() {
            warn!(provider = self.label(), resource = %id, error = %error, "Provider failed");
        }
    }

    fn install_pending(self: &Arc<Self>, id: &ResourceId, token: CancellationToken, future: DecorationFuture) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.report_failure(id, &Error::Runtime(format!("deferred decoration dropped: {}", e)));
                return;
            }
        };

        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst);
        let previous = self.data.lock().set(
            id.clone(),
            CacheEntry::Pending(PendingRequest {
                ticket,
                token: token.clone(),
            }),
        );
        // 다른 호출이 그 사이에 설치한 요청
        if let Some(CacheEntry::Pending(previous)) = previous {
            previous.token.cancel();
        }

        trace!(provider = self.label(), resource = %id, ticket, "Request pending");

        let weak = Arc::downgrade(self);
        let id = id.clone();
        runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                outcome = future => outcome,
            };
            if let Some(inner) = weak.upgrade() {
                inner.complete(&id, ticket, outcome);
            }
        });
    }

    fn complete(&self, id: &ResourceId, ticket: u64, outcome: Result<Option<Decoration>>) {
        let mut data = self.data.lock();
        let current = matches!(
            data.get(id),
            Some(CacheEntry::Pending(pending)) if pending.ticket == ticket
        );
        if !current {
            trace!(provider = self.label(), resource = %id, ticket, "Dropped stale result");
            return;
        }

        match outcome {
            Ok(decoration) => {
                let changed = store(&mut data, id, decoration);
                drop(data);
                if changed {
                    (self.sink)(CacheChange::Resource(id.clone()));
                }
            }
            Err(e) => {
                // 취소를 포함한 모든 실패는 Unknown으로 되돌려 다음 조회 때 다시 요청
                data.delete(id);
                drop(data);
                self.report_failure(id, &e);
            }
        }
    }

    fn settle(&self, id: &ResourceId, decoration: Option<Decoration>) -> Option<Decoration> {
        let changed = store(&mut self.data.lock(), id, decoration.clone());
        if changed {
            (self.sink)(CacheChange::Resource(id.clone()));
        }
        decoration
    }

    fn on_provider_change(self: &Arc<Self>, change: &ProviderChange) {
        match change {
            ProviderChange::Flush => {
                // Pending은 취소하지 않고 버림
                let dropped = {
                    let mut data = self.data.lock();
                    let len = data.len();
                    data.clear();
                    len
                };
                debug!(provider = self.label(), dropped, "Provider flushed");
                (self.sink)(CacheChange::Flush);
            }
            ProviderChange::Resources(ids) => {
                debug!(provider = self.label(), count = ids.len(), "Provider invalidated resources");
                for id in ids {
                    self.fetch(id);
                }
            }
        }
    }
}

/// Settled 항목 기록, 알림이 필요하면 true
///
/// 이전이 Pending이면 항상 알리고, 같은 값으로 다시 결정된 경우는 알리지 않습니다.
fn store(data: &mut ResourceTrie<CacheEntry>, id: &ResourceId, decoration: Option<Decoration>) -> bool {
    let changed = match data.get(id) {
        None | Some(CacheEntry::Settled(None)) => decoration.is_some(),
        Some(CacheEntry::Pending(_)) => true,
        Some(CacheEntry::Settled(Some(old))) => decoration.as_ref() != Some(old),
    };
    data.set(id.clone(), CacheEntry::Settled(decoration));
    changed
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FnProvider;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    fn recording_sink() -> (ChangeSink, Arc<Mutex<Vec<CacheChange>>>) {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink_changes = changes.clone();
        let sink: ChangeSink = Arc::new(move |change: CacheChange| sink_changes.lock().push(change));
        (sink, changes)
    }

    fn counting_provider(
        decoration: Option<Decoration>,
    ) -> (Arc<FnProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = Arc::new(FnProvider::new("sync", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Provision::Ready(decoration.clone()))
        }));
        (provider, calls)
    }

    #[test]
    fn test_sync_settle_emits_once() {
        let (provider, calls) = counting_provider(Some(Decoration::new().letter("M")));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        let mut seen = Vec::new();
        cache.get_or_retrieve(&id("a"), false, |d, child| seen.push((d.clone(), child)));
        cache.get_or_retrieve(&id("a"), false, |d, child| seen.push((d.clone(), child)));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].1);
        assert_eq!(*changes.lock(), vec![CacheChange::Resource(id("a"))]);
    }

    #[test]
    fn test_absent_is_cached() {
        let (provider, calls) = counting_provider(None);
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        for _ in 0..3 {
            cache.get_or_retrieve(&id("a"), true, |_, _| panic!("nothing to emit"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(&id("a")), EntryState::Absent);
        // 없음 -> 없음은 알릴 것이 없음
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn test_equal_resettle_is_silent() {
        let (provider, _) = counting_provider(Some(Decoration::new().color("red")));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        cache.fetch(&id("a"));
        cache.fetch(&id("a"));
        assert_eq!(changes.lock().len(), 1);
    }

    #[test]
    fn test_present_to_absent_emits() {
        let present = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let flag = present.clone();
        let provider = Arc::new(FnProvider::new("toggle", move |_, _| {
            Ok(if flag.load(Ordering::SeqCst) {
                Provision::ready(Decoration::new().letter("A"))
            } else {
                Provision::absent()
            })
        }));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider.clone(), sink);

        cache.fetch(&id("a"));
        present.store(false, Ordering::SeqCst);
        provider.notify(ProviderChange::resources([id("a")]));

        assert_eq!(cache.state(&id("a")), EntryState::Absent);
        assert_eq!(changes.lock().len(), 2);
    }

    #[test]
    fn test_sync_failure_stays_unknown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = Arc::new(FnProvider::new("broken", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::provider("boom"))
        }));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        cache.get_or_retrieve(&id("a"), false, |_, _| {});
        cache.get_or_retrieve(&id("a"), false, |_, _| {});

        assert_eq!(cache.state(&id("a")), EntryState::Unknown);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(changes.lock().is_empty());
    }

    #[test]
    fn test_children_are_not_fetched() {
        let provider = Arc::new(FnProvider::new("per-path", |id, _| {
            Ok(match id.name() {
                Some("b") => Provision::ready(Decoration::new().letter("B").bubble(true)),
                Some("c") => Provision::ready(Decoration::new().letter("C")),
                _ => Provision::absent(),
            })
        }));
        let (sink, _) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        // 하위 항목은 다른 조회로 이미 캐시되어 있어야만 보임
        let mut seen = Vec::new();
        cache.get_or_retrieve(&id("a"), true, |d, child| seen.push((d.letter.clone(), child)));
        assert!(seen.is_empty());

        cache.fetch(&id("a/b"));
        cache.fetch(&id("a/c"));
        cache.get_or_retrieve(&id("a"), true, |d, child| seen.push((d.letter.clone(), child)));
        assert_eq!(
            seen,
            vec![(Some("B".to_string()), true), (Some("C".to_string()), true)]
        );
    }

    #[tokio::test]
    async fn test_pending_and_absent_children_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = Arc::new(FnProvider::new("mixed", move |id, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(match id.name() {
                Some("p") => Provision::deferred(futures::future::pending()),
                Some("n") => Provision::absent(),
                Some("x") => Provision::ready(Decoration::new().letter("X")),
                _ => Provision::ready(Decoration::new().letter("A")),
            })
        }));
        let (sink, _) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        for name in ["a/p", "a/n", "a/x", "a"] {
            cache.fetch(&id(name));
        }
        assert_eq!(cache.state(&id("a/p")), EntryState::Pending);
        assert_eq!(cache.state(&id("a/n")), EntryState::Absent);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let mut seen = Vec::new();
        cache.get_or_retrieve(&id("a"), true, |d, child| seen.push((d.letter.clone(), child)));
        cache.get_or_retrieve(&id("a"), true, |_, _| {});

        assert_eq!(
            seen,
            vec![(Some("A".to_string()), false), (Some("X".to_string()), true)]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.state(&id("a/p")), EntryState::Pending);
    }

    #[test]
    fn test_flush_clears_everything() {
        let (provider, calls) = counting_provider(Some(Decoration::new()));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider.clone(), sink);

        cache.fetch(&id("a"));
        cache.fetch(&id("b/c"));
        provider.notify(ProviderChange::Flush);

        assert!(cache.is_empty());
        assert!(!cache.knows_about(&id("b")));
        assert_eq!(changes.lock().last(), Some(&CacheChange::Flush));

        cache.get_or_retrieve(&id("a"), false, |_, _| {});
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_selective_invalidation_refetches_named_only() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = calls.clone();
        let provider = Arc::new(FnProvider::new("recording", move |id, _| {
            recorder.lock().push(id.to_string());
            Ok(Provision::ready(Decoration::new()))
        }));
        let (sink, _) = recording_sink();
        let cache = ProviderCache::new(provider.clone(), sink);

        cache.fetch(&id("x"));
        cache.fetch(&id("z"));
        calls.lock().clear();

        // y는 캐시에 없어도 다시 요청됨
        provider.notify(ProviderChange::resources([id("x"), id("y")]));
        assert_eq!(*calls.lock(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(cache.state(&id("z")), EntryState::Present(Decoration::new()));
    }

    #[test]
    fn test_knows_about_and_withdraw() {
        let (provider, _) = counting_provider(None);
        let (sink, _) = recording_sink();
        let cache = ProviderCache::new(provider.clone(), sink);

        cache.fetch(&id("a/b"));
        assert!(cache.knows_about(&id("a")));
        assert!(cache.knows_about(&id("a/b")));
        assert!(!cache.knows_about(&id("z")));

        let withdrawn = cache.withdraw();
        assert!(withdrawn.knows_about(&id("a")));
        assert!(cache.is_empty());
        assert_eq!(provider.on_change().listener_count(), 0);
    }

    #[test]
    fn test_dispose_stops_listening() {
        let (provider, calls) = counting_provider(Some(Decoration::new()));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider.clone(), sink);

        cache.fetch(&id("a"));
        cache.dispose();
        cache.dispose();
        provider.notify(ProviderChange::resources([id("a")]));
        provider.notify(ProviderChange::Flush);

        assert!(cache.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(changes.lock().len(), 1);
    }

    #[test]
    fn test_deferred_without_runtime_is_dropped() {
        let provider = Arc::new(FnProvider::new("async", |_, _| {
            Ok(Provision::deferred(async { Ok(Some(Decoration::new())) }))
        }));
        let (sink, _) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        assert_eq!(cache.fetch(&id("a")), None);
        assert_eq!(cache.state(&id("a")), EntryState::Unknown);
    }

    #[tokio::test]
    async fn test_deferred_settles_later() {
        let (tx, rx) = oneshot::channel::<Decoration>();
        let rx = Mutex::new(Some(rx));
        let provider = Arc::new(FnProvider::new("async", move |_, _| {
            let rx = rx.lock().take().expect("single request");
            Ok(Provision::deferred(async move {
                rx.await.map(Some).map_err(|_| Error::Cancelled)
            }))
        }));
        let (notify_tx, mut notify_rx) = tokio::sync::mpsc::unbounded_channel();
        let sink: ChangeSink = Arc::new(move |change: CacheChange| {
            let _ = notify_tx.send(change);
        });
        let cache = ProviderCache::new(provider, sink);

        assert_eq!(cache.fetch(&id("a")), None);
        assert_eq!(cache.state(&id("a")), EntryState::Pending);

        tx.send(Decoration::new().letter("L")).unwrap();
        assert_eq!(notify_rx.recv().await, Some(CacheChange::Resource(id("a"))));
        assert_eq!(
            cache.state(&id("a")),
            EntryState::Present(Decoration::new().letter("L"))
        );
    }

    #[tokio::test]
    async fn test_deferred_failure_reverts_to_unknown() {
        let provider = Arc::new(FnProvider::new("async", |_, _| {
            Ok(Provision::deferred(async { Err(Error::provider("offline")) }))
        }));
        let (sink, changes) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        cache.fetch(&id("a"));
        assert_eq!(cache.state(&id("a")), EntryState::Pending);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.state(&id("a")), EntryState::Unknown);
        assert!(changes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_cancels_pending_token() {
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let recorder = tokens.clone();
        let provider = Arc::new(FnProvider::new("slow", move |_, token: CancellationToken| {
            recorder.lock().push(token.clone());
            Ok(Provision::deferred(async move {
                token.cancelled().await;
                Err(Error::Cancelled)
            }))
        }));
        let (sink, _) = recording_sink();
        let cache = ProviderCache::new(provider, sink);

        cache.fetch(&id("a"));
        cache.fetch(&id("a"));

        let tokens = tokens.lock();
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_cancelled());
        assert!(!tokens[1].is_cancelled());
        assert_eq!(cache.len(), 1);
    }
}
