//! Emitter - 동기 이벤트 발행/구독
//!
//! 리스너는 `fire()` 호출 스레드에서 즉시 실행됩니다.
//! 스트림 방식 소비자는 `receiver()`로 broadcast 수신자를 얻을 수 있습니다.

use super::disposable::Disposable;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// 기본 broadcast 채널 용량
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// ListenerId / Listener
// ============================================================================

/// 리스너 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// 리스너 함수
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

// ============================================================================
// Emitter
// ============================================================================

/// 이벤트 이미터
///
/// ```ignore
/// let emitter = Arc::new(Emitter::<u32>::new("numbers"));
/// let subscription = emitter.subscribe(|n| println!("got {}", n));
/// emitter.fire(7);
/// subscription.dispose();
/// ```
pub struct Emitter<T> {
    /// 이름 (디버깅용)
    name: String,

    /// 등록된 리스너 (등록 순서 유지)
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,

    /// 리스너 ID 카운터
    listener_counter: AtomicU64,

    /// broadcast 송신자
    sender: broadcast::Sender<T>,

    /// 발행된 이벤트 수
    event_count: AtomicU64,
}

impl<T: Clone + Send + 'static> Emitter<T> {
    /// 기본 용량으로 생성
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_CHANNEL_CAPACITY)
    }

    /// broadcast 용량 지정 생성
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            listeners: RwLock::new(Vec::new()),
            listener_counter: AtomicU64::new(0),
            sender,
            event_count: AtomicU64::new(0),
        }
    }

    /// 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 리스너 등록 (반환된 핸들로 해제)
    pub fn subscribe(self: &Arc<Self>, listener: impl Fn(&T) + Send + Sync + 'static) -> Disposable {
        let id = ListenerId(self.listener_counter.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, Arc::new(listener)));

        debug!(emitter = %self.name, listener_id = %id, "Registered listener");

        let emitter: Weak<Self> = Arc::downgrade(self);
        Disposable::new(move || {
            if let Some(emitter) = emitter.upgrade() {
                emitter.unsubscribe(id);
            }
        })
    }

    /// 리스너 해제
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;

        if removed {
            debug!(emitter = %self.name, listener_id = %id, "Unregistered listener");
        }
        removed
    }

    /// 이벤트 발행
    ///
    /// 리스너 목록의 스냅샷을 떠서 락 없이 호출하므로 리스너 안에서
    /// 구독/해제/재발행이 가능합니다.
    pub fn fire(&self, event: T) {
        let count = self.event_count.fetch_add(1, Ordering::SeqCst) + 1;
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(
            emitter = %self.name,
            listeners = listeners.len(),
            "Firing event #{}", count
        );

        for listener in &listeners {
            listener(&event);
        }

        // 수신자가 없으면 실패하지만 정상 상황
        let _ = self.sender.send(event);
    }

    /// broadcast 수신자 생성 (스트림 방식)
    pub fn receiver(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// 등록된 리스너 수
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("name", &self.name)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

// ============================================================================
// 테스트
// ============================================================================
