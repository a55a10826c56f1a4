//! 데코레이션 변경 이벤트
//!
//! 영향받는 리소스 목록을 넘기는 대신 판정 함수(`affects_resource`)를 제공합니다.
//! flush나 Provider 추가처럼 대상을 열거할 수 없는 변경도 같은 형태로 표현됩니다.

use decor_foundation::{ResourceId, ResourceTrie};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// ResourceScope
// ============================================================================

/// 변경 범위 판정
pub trait ResourceScope: Send + Sync {
    /// `id`의 표시가 이 변경의 영향을 받는지
    fn affects(&self, id: &ResourceId) -> bool;
}

/// 트라이에 있는 리소스(또는 그 하위)가 바뀌었으면 상위 표시도 영향을 받음
impl<V: Send + Sync> ResourceScope for ResourceTrie<V> {
    fn affects(&self, id: &ResourceId) -> bool {
        self.knows_about(id)
    }
}

/// 여러 범위의 합집합
pub struct ScopeUnion(Vec<Arc<dyn ResourceScope>>);

impl ResourceScope for ScopeUnion {
    fn affects(&self, id: &ResourceId) -> bool {
        self.0.iter().any(|scope| scope.affects(id))
    }
}

// ============================================================================
// DecorationChange
// ============================================================================

/// 데코레이션 변경 이벤트
#[derive(Clone)]
pub enum DecorationChange {
    /// 모든 리소스가 영향받을 수 있음
    Everything,

    /// 범위 안의 리소스만 영향받음
    Scoped(Arc<dyn ResourceScope>),
}

impl DecorationChange {
    /// 단일 리소스 변경
    pub fn resource(id: ResourceId) -> Self {
        Self::resources([id])
    }

    /// 여러 리소스 변경
    pub fn resources(ids: impl IntoIterator<Item = ResourceId>) -> Self {
        let mut changed = ResourceTrie::new();
        for id in ids {
            changed.set(id, ());
        }
        Self::Scoped(Arc::new(changed))
    }

    /// 임의 범위 변경
    pub fn scoped(scope: impl ResourceScope + 'static) -> Self {
        Self::Scoped(Arc::new(scope))
    }

    /// `id`가 영향받는지
    pub fn affects_resource(&self, id: &ResourceId) -> bool {
        match self {
            DecorationChange::Everything => true,
            DecorationChange::Scoped(scope) => scope.affects(id),
        }
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, DecorationChange::Everything)
    }

    /// 두 이벤트 병합
    pub fn merge(self, other: DecorationChange) -> DecorationChange {
        match (self, other) {
            (DecorationChange::Everything, _) | (_, DecorationChange::Everything) => {
                DecorationChange::Everything
            }
            (DecorationChange::Scoped(a), DecorationChange::Scoped(b)) => {
                DecorationChange::Scoped(Arc::new(ScopeUnion(vec![a, b])))
            }
        }
    }
}

impl fmt::Debug for DecorationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecorationChange::Everything => f.write_str("Everything"),
            DecorationChange::Scoped(_) => f.write_str("Scoped(..)"),
        }
    }
}
