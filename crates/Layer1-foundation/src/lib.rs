//! # decor-foundation
//!
//! Foundation layer for Decor:
//! - Resource: 계층형 식별자 (ResourceId) + 하위 조회 트라이 (ResourceTrie)
//! - Event: 동기 이미터 (Emitter) + 멱등 해제 핸들 (Disposable)
//! - Config: DecorationsConfig, ConfigStore (global → project 계층)
//! - Error: 공통 에러 타입
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  decor-core (DecorationRegistry / ProviderCache)        │
//! │                     │                                   │
//! │          ┌──────────┼───────────┐                       │
//! │          ▼          ▼           ▼                       │
//! │   ResourceTrie   Emitter    DecorationsConfig           │
//! │   (캐시 저장소)  (변경 알림)  (ConfigStore)            │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod resource;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Resource (식별자 / 트라이)
// ============================================================================
pub use resource::{Descendants, ResourceId, ResourceTrie};

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{Disposable, Emitter, Listener, ListenerId, DEFAULT_CHANNEL_CAPACITY};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ConfigStore, DecorationsConfig, DecorationsConfigLayer, CONFIG_DIR_NAME, DECORATIONS_CONFIG_FILE,
};
