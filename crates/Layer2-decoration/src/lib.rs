//! # decor-core
//!
//! Multi-provider decoration cache:
//! - Types: Decoration, DecorationProvider, Provision, ProviderChange
//! - ProviderCache: Provider별 계층형 캐시 (중복 요청 취소, 오래된 결과 무시)
//! - DecorationRegistry: Provider 집합, 조회 집계, 변경 이벤트 재발행
//! - Change: 판정 함수 형태의 변경 이벤트 (DecorationChange)
//!
//! ## 흐름
//!
//! ```text
//! caller ──get_decoration──▶ DecorationRegistry ──▶ ProviderCache* ──▶ Provider
//!    ▲                               │                    │ (비동기 완료)
//!    └──── on_did_change ◀───────────┴────── CacheChange ◀┘
//! ```

pub mod change;
pub mod coalesce;
pub mod provider_cache;
pub mod registry;
pub mod types;

pub use change::{DecorationChange, ResourceScope, ScopeUnion};
pub use coalesce::ChangeCoalescer;
pub use provider_cache::{CacheChange, CacheEntry, ChangeSink, EntryState, PendingRequest, ProviderCache};
pub use registry::DecorationRegistry;
pub use types::{Decoration, DecorationFuture, DecorationProvider, FnProvider, ProviderChange, Provision};

// Foundation re-exports
pub use decor_foundation::{
    DecorationsConfig, Disposable, Emitter, Error, ResourceId, ResourceTrie, Result,
};
