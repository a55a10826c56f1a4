//! Error types for Decor
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Decor 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 리소스 식별자 관련
    // ========================================================================
    #[error("Invalid resource identifier: {0}")]
    InvalidResource(String),

    // ========================================================================
    // Provider 관련
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    /// 대체되었거나 취소된 요청 (항상 조용히 무시됨)
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Runtime error: {0}")]
    Runtime(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 취소 신호인지 확인
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Provider 에러 생성 헬퍼
    pub fn provider(message: impl Into<String>) -> Self {
        Error::Provider(message.into())
    }

    /// 잘못된 식별자 에러 생성 헬퍼
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Error::InvalidResource(message.into())
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
