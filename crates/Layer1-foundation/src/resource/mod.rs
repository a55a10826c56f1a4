//! Resource - 계층형 리소스 식별자와 트라이
//!
//! - [`ResourceId`]: 정규화된 식별자 (동등성, 하위 포함 판정, 문자열 왕복)
//! - [`ResourceTrie`]: 정확 조회 + 하위 전체 조회를 지원하는 계층형 맵

pub mod id;
pub mod trie;

pub use id::ResourceId;
pub use trie::{Descendants, ResourceTrie};
