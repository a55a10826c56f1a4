//! Decorations Config - 데코레이션 서비스 설정

use super::store::ConfigStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 설정 파일명
pub const DECORATIONS_CONFIG_FILE: &str = "decorations.json";

const DEFAULT_CHANGE_DEBOUNCE_MS: u64 = 0;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// 데코레이션 서비스 설정 (계층 병합 결과)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorationsConfig {
    /// 변경 이벤트 병합 구간 (ms)
    ///
    /// 0이면 이벤트를 즉시 전달하고, 그 외에는 구간 안에서 발생한
    /// 이벤트를 하나로 병합해 전달합니다.
    pub change_debounce_ms: u64,

    /// 변경 이벤트 broadcast 채널 용량
    pub event_channel_capacity: usize,
}

/// 파일 하나에 담긴 설정 계층
///
/// 적힌 항목만 아래 계층을 덮어씁니다. 기본값과 같은 값도 명시적으로
/// 적혀 있으면 적용됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecorationsConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_debounce_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_channel_capacity: Option<usize>,
}

impl Default for DecorationsConfig {
    fn default() -> Self {
        Self {
            change_debounce_ms: DEFAULT_CHANGE_DEBOUNCE_MS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl DecorationsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 현재 디렉토리 프로젝트 설정 로드
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_for_project(cwd)
    }

    /// 글로벌 + 지정 프로젝트 설정 로드
    pub fn load_for_project(root: impl AsRef<Path>) -> Result<Self> {
        Self::load_layers(&ConfigStore::layers(root))
    }

    /// 계층 순서대로 병합 (뒤쪽 계층 우선)
    pub fn load_layers(stores: &[ConfigStore]) -> Result<Self> {
        let mut config = Self::new();
        for store in stores {
            if let Some(layer) = store.read::<DecorationsConfigLayer>(DECORATIONS_CONFIG_FILE)? {
                debug!(dir = %store.dir().display(), ?layer, "Applying decorations config layer");
                config.apply(layer);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// JSON 문자열 파싱 (없는 항목은 기본값)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let layer: DecorationsConfigLayer = serde_json::from_str(json)?;
        let mut config = Self::new();
        config.apply(layer);
        config.validate()?;
        Ok(config)
    }

    /// 계층 적용 (적힌 항목만 덮어씀)
    pub fn apply(&mut self, layer: DecorationsConfigLayer) {
        if let Some(millis) = layer.change_debounce_ms {
            self.change_debounce_ms = millis;
        }
        if let Some(capacity) = layer.event_channel_capacity {
            self.event_channel_capacity = capacity;
        }
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "eventChannelCapacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 모든 항목을 명시한 계층으로 변환 (저장용)
    pub fn to_layer(&self) -> DecorationsConfigLayer {
        DecorationsConfigLayer {
            change_debounce_ms: Some(self.change_debounce_ms),
            event_channel_capacity: Some(self.event_channel_capacity),
        }
    }

    // ========================================================================
    // Builder / Accessors
    // ========================================================================

    pub fn change_debounce_ms(mut self, millis: u64) -> Self {
        self.change_debounce_ms = millis;
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// 병합 구간 (비활성화 시 None)
    pub fn change_debounce(&self) -> Option<Duration> {
        (self.change_debounce_ms > 0).then(|| Duration::from_millis(self.change_debounce_ms))
    }
}
