//! Config - 설정 관리
//!
//! - `decorations.rs` - DecorationsConfig (이벤트 병합, 채널 용량) + 파일 계층
//! - `store.rs` - ConfigStore (global → project 계층 디렉토리)

mod decorations;
mod store;

pub use decorations::{DecorationsConfig, DecorationsConfigLayer, DECORATIONS_CONFIG_FILE};
pub use store::{ConfigStore, CONFIG_DIR_NAME};
