//! Decoration 데이터 모델과 Provider 인터페이스

use decor_foundation::{Emitter, ResourceId, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Decoration
// ============================================================================

/// 리소스에 붙는 데코레이션 (배지, 색상, 툴팁)
///
/// 모든 필드는 선택 사항입니다. `bubble`이 true면 상위 리소스가
/// "하위 포함" 조회를 할 때 결과에 포함됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decoration {
    /// 정렬 힌트 (소비자가 대표 데코레이션을 고를 때 사용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,

    /// 색상 토큰
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// 짧은 라벨 (예: "M", "U")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    /// 상위 리소스로 전파 여부
    #[serde(default)]
    pub bubble: bool,
}

impl Decoration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn letter(mut self, letter: impl Into<String>) -> Self {
        self.letter = Some(letter.into());
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }
}

// ============================================================================
// ProviderChange
// ============================================================================

/// Provider 변경 알림
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderChange {
    /// 모든 결과가 무효 (flush)
    Flush,

    /// 지정된 리소스만 무효
    Resources(Vec<ResourceId>),
}

impl ProviderChange {
    pub fn resources(ids: impl IntoIterator<Item = ResourceId>) -> Self {
        Self::Resources(ids.into_iter().collect())
    }
}

// ============================================================================
// Provision
// ============================================================================

/// 비동기 조회 결과
pub type DecorationFuture = BoxFuture<'static, Result<Option<Decoration>>>;

/// `provide_decorations` 응답
pub enum Provision {
    /// 즉시 결정됨 (None = 데코레이션 없음)
    Ready(Option<Decoration>),

    /// 나중에 결정됨
    Deferred(DecorationFuture),
}

impl Provision {
    pub fn ready(decoration: Decoration) -> Self {
        Self::Ready(Some(decoration))
    }

    pub fn absent() -> Self {
        Self::Ready(None)
    }

    pub fn deferred(
        future: impl Future<Output = Result<Option<Decoration>>> + Send + 'static,
    ) -> Self {
        Self::Deferred(future.boxed())
    }
}

impl fmt::Debug for Provision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provision::Ready(decoration) => f.debug_tuple("Ready").field(decoration).finish(),
            Provision::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

// ============================================================================
// DecorationProvider Trait
// ============================================================================

/// 데코레이션 Provider
///
/// `provide_decorations`에서 반환한 `Err`는 Provider 실패로 취급되어
/// 캐시되지 않으며, 다음 조회에서 다시 요청됩니다.
pub trait DecorationProvider: Send + Sync {
    /// 라벨 (로그/디버깅용)
    fn label(&self) -> &str;

    /// 변경 알림 스트림
    fn on_change(&self) -> &Arc<Emitter<ProviderChange>>;

    /// 리소스의 데코레이션 조회
    ///
    /// `token`은 요청이 대체되면 취소됩니다. 취소를 존중하는 것은 선택이며,
    /// 대체된 요청의 결과는 어차피 무시됩니다.
    fn provide_decorations(&self, id: &ResourceId, token: CancellationToken) -> Result<Provision>;
}

// ============================================================================
// FnProvider - 클로저 기반 Provider
// ============================================================================

type ProvideFn = dyn Fn(&ResourceId, CancellationToken) -> Result<Provision> + Send + Sync;

/// 클로저로 구현하는 Provider
///
/// ```ignore
/// let provider = FnProvider::new("git", |id, _token| {
///     Ok(Provision::ready(Decoration::new().letter("M")))
/// });
/// provider.notify(ProviderChange::Flush);
/// ```
pub struct FnProvider {
    label: String,
    on_change: Arc<Emitter<ProviderChange>>,
    provide: Box<ProvideFn>,
}

impl FnProvider {
    pub fn new(
        label: impl Into<String>,
        provide: impl Fn(&ResourceId, CancellationToken) -> Result<Provision> + Send + Sync + 'static,
    ) -> Self {
        let label = label.into();
        Self {
            on_change: Arc::new(Emitter::new(format!("{}.onChange", label))),
            label,
            provide: Box::new(provide),
        }
    }

    /// 변경 알림 발행
    pub fn notify(&self, change: ProviderChange) {
        self.on_change.fire(change);
    }
}

impl DecorationProvider for FnProvider {
    fn label(&self) -> &str {
        &self.label
    }

    fn on_change(&self) -> &Arc<Emitter<ProviderChange>> {
        &self.on_change
    }

    fn provide_decorations(&self, id: &ResourceId, token: CancellationToken) -> Result<Provision> {
        (self.provide)(id, token)
    }
}

impl fmt::Debug for FnProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider")
            .field("label", &self.label)
            .finish()
    }
}
