//! DecorationRegistry - Provider 집합과 조회 집계
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   DecorationRegistry                      │
//! │  get_decoration(id) ──┬──────────────┬──────────────┐     │
//! │                       ▼              ▼              ▼     │
//! │               ProviderCache 1  ProviderCache 2  ...       │
//! │                       │              │                    │
//! │                       └── CacheChange ──▶ on_did_change   │
//! │                                          (DecorationChange)│
//! └──────────────────────────────────────────────────────────┘
//! ```

use crate::change::DecorationChange;
use crate::coalesce::ChangeCoalescer;
use crate::provider_cache::{CacheChange, ChangeSink, ProviderCache};
use crate::types::{Decoration, DecorationProvider};
use decor_foundation::{DecorationsConfig, Disposable, Emitter, ResourceId};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 데코레이션 레지스트리
///
/// ## 사용법
///
/// ```ignore
/// let registry = DecorationRegistry::new();
/// let registration = registry.register_provider(Arc::new(provider));
///
/// let _subscription = registry.on_did_change_decorations().subscribe(|change| {
///     if change.affects_resource(&displayed) { /* 다시 조회 */ }
/// });
///
/// let decorations = registry.get_decoration(&displayed, true);
/// registration.dispose();
/// ```
pub struct DecorationRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: DecorationsConfig,

    /// 활성 캐시 (등록 순서)
    caches: RwLock<Vec<(u64, Arc<ProviderCache>)>>,

    /// 등록 ID 카운터
    registration_counter: AtomicU64,

    /// 변경 이벤트
    on_did_change: Arc<Emitter<DecorationChange>>,

    /// 병합 구간이 설정된 경우에만 존재
    coalescer: Option<ChangeCoalescer>,
}

impl DecorationRegistry {
    /// 기본 설정으로 생성
    pub fn new() -> Self {
        Self::with_config(DecorationsConfig::default())
    }

    /// 설정 지정 생성
    pub fn with_config(config: DecorationsConfig) -> Self {
        let on_did_change = Arc::new(Emitter::with_capacity(
            "decorations.onDidChange",
            config.event_channel_capacity,
        ));
        let coalescer = config
            .change_debounce()
            .map(|window| ChangeCoalescer::new(window, Arc::clone(&on_did_change)));

        Self {
            inner: Arc::new(RegistryInner {
                config,
                caches: RwLock::new(Vec::new()),
                registration_counter: AtomicU64::new(0),
                on_did_change,
                coalescer,
            }),
        }
    }

    pub fn config(&self) -> &DecorationsConfig {
        &self.inner.config
    }

    // ========================================================================
    // 등록 / 해제
    // ========================================================================

    /// Provider 등록
    ///
    /// 등록 즉시 전체 변경 이벤트가 발생합니다. 반환된 핸들을 해제하면
    /// 이 Provider가 알고 있던 리소스에 한정된 변경 이벤트가 발생합니다.
    pub fn register_provider(&self, provider: Arc<dyn DecorationProvider>) -> Disposable {
        let id = self.inner.registration_counter.fetch_add(1, Ordering::SeqCst);

        let weak = Arc::downgrade(&self.inner);
        let sink: ChangeSink = Arc::new(move |change: CacheChange| {
            if let Some(inner) = weak.upgrade() {
                inner.publish(match change {
                    CacheChange::Resource(resource) => DecorationChange::resource(resource),
                    CacheChange::Flush => DecorationChange::Everything,
                });
            }
        });

        let cache = Arc::new(ProviderCache::new(provider, sink));
        info!(provider = cache.label(), registration = id, "Registered decoration provider");
        self.inner.caches.write().push((id, cache));

        self.inner.publish(DecorationChange::Everything);

        let weak = Arc::downgrade(&self.inner);
        Disposable::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unregister(id);
            }
        })
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 리소스 데코레이션 조회
    ///
    /// 등록 순서대로 각 Provider의 정확 일치 항목, 그 다음 `bubble`이 설정된
    /// 하위 항목이 담깁니다. 비동기 Provider를 기다리지 않으며, 새 결과는
    /// 변경 이벤트 후 다시 조회해야 보입니다.
    pub fn get_decoration(&self, id: &ResourceId, include_children: bool) -> Vec<Decoration> {
        // 스냅샷 후 락 해제 (조회 중 발생한 이벤트의 리스너가 재진입할 수 있음)
        let caches: Vec<Arc<ProviderCache>> = self
            .inner
            .caches
            .read()
            .iter()
            .map(|(_, cache)| Arc::clone(cache))
            .collect();

        let mut decorations = Vec::new();
        for cache in &caches {
            cache.get_or_retrieve(id, include_children, |decoration, is_child| {
                if !is_child || decoration.bubble {
                    decorations.push(decoration.clone());
                }
            });
        }
        decorations
    }

    /// 변경 이벤트
    pub fn on_did_change_decorations(&self) -> &Arc<Emitter<DecorationChange>> {
        &self.inner.on_did_change
    }

    /// 병합 대기 중인 변경 이벤트를 즉시 전달
    pub fn flush_pending_changes(&self) {
        if let Some(coalescer) = &self.inner.coalescer {
            coalescer.flush();
        }
    }

    /// 등록된 Provider 수
    pub fn provider_count(&self) -> usize {
        self.inner.caches.read().len()
    }

    /// 등록된 Provider 라벨 (등록 순서)
    pub fn provider_labels(&self) -> Vec<String> {
        self.inner
            .caches
            .read()
            .iter()
            .map(|(_, cache)| cache.label().to_string())
            .collect()
    }
}

impl Default for DecorationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DecorationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecorationRegistry")
            .field("providers", &self.provider_labels())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl RegistryInner {
    fn publish(&self, change: DecorationChange) {
        match &self.coalescer {
            Some(coalescer) => coalescer.push(change),
            None => self.on_did_change.fire(change),
        }
    }

    fn unregister(&self, id: u64) {
        let cache = {
            let mut caches = self.caches.write();
            let Some(position) = caches.iter().position(|(existing, _)| *existing == id) else {
                return;
            };
            caches.remove(position).1
        };

        // 해제 시점의 캐시 내용이 곧 이 Provider가 알던 범위
        let knowledge = cache.withdraw();
        info!(
            provider = cache.label(),
            registration = id,
            known_entries = knowledge.len(),
            "Unregistered decoration provider"
        );
        debug!(remaining = self.caches.read().len(), "Active decoration providers");

        self.publish(DecorationChange::scoped(knowledge));
    }
}
