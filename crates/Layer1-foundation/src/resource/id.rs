//! ResourceId - 계층형 리소스 식별자
//!
//! 지원 형식:
//! - `scheme://authority/seg/seg` (URI 형식)
//! - `/seg/seg`, `seg/seg` (일반 경로)
//!
//! 파싱 시 scheme은 소문자로, 빈 세그먼트와 `.` 세그먼트는 제거됩니다.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 계층형 리소스 식별자
///
/// `origin`(scheme + authority 또는 경로 루트)이 같고 세그먼트가 접두사 관계이면
/// 하위 리소스로 취급합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// `scheme://authority`, `/` (루트 경로) 또는 `` (상대 경로)
    origin: String,
    segments: Vec<String>,
}

impl ResourceId {
    /// 문자열 파싱
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::invalid_resource("empty identifier"));
        }

        let (origin, path) = match input.split_once("://") {
            Some((scheme, rest)) => {
                if scheme.is_empty() || !is_valid_scheme(scheme) {
                    return Err(Error::invalid_resource(format!(
                        "bad scheme in '{}'",
                        input
                    )));
                }
                let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
                (
                    format!("{}://{}", scheme.to_ascii_lowercase(), authority),
                    path,
                )
            }
            None if input.starts_with('/') => ("/".to_string(), input),
            None => (String::new(), input),
        };

        let segments = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect::<Vec<_>>();

        if origin.is_empty() && segments.is_empty() {
            return Err(Error::invalid_resource(format!(
                "no path segments in '{}'",
                input
            )));
        }

        Ok(Self { origin, segments })
    }

    /// origin (`scheme://authority`, `/` 또는 빈 문자열)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// scheme (일반 경로는 None)
    pub fn scheme(&self) -> Option<&str> {
        self.origin.split_once("://").map(|(scheme, _)| scheme)
    }

    /// 경로 세그먼트
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 마지막 세그먼트
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// 상위 리소스 (루트이면 None)
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() || (self.origin.is_empty() && self.segments.len() == 1) {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self {
            origin: self.origin.clone(),
            segments,
        })
    }

    /// 하위 세그먼트 추가
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            segment
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string),
        );
        Self {
            origin: self.origin.clone(),
            segments,
        }
    }

    /// `ancestor`의 엄격한 하위 리소스인지 확인
    pub fn is_descendant_of(&self, ancestor: &ResourceId) -> bool {
        self.origin == ancestor.origin
            && self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// 같거나 하위 리소스인지 확인
    pub fn is_equal_or_descendant_of(&self, ancestor: &ResourceId) -> bool {
        self == ancestor || self.is_descendant_of(ancestor)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.segments.join("/");
        if self.origin.is_empty() {
            f.write_str(&path)
        } else if self.origin == "/" {
            write!(f, "/{}", path)
        } else {
            write!(f, "{}/{}", self.origin, path)
        }
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ResourceId {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
