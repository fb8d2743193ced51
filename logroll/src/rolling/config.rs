//! 회전 작성기 설정
//!
//! 생성 시점에 한 번 확정되는 불변 설정입니다.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, RollingError};

/// 기본 파일 보관 기간 (30일)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 3600);
/// 기본 정리 간격 (24시간)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 3600);
/// 기본 회전 간격 (24시간)
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(24 * 3600);
/// 기본 플러시 간격 (5초)
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// 기본 큐 초기 용량
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// 기본 출력 버퍼 크기 (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// 파일 이름 패턴에 허용하지 않는 문자
const FORBIDDEN_PATTERN_CHARS: &[char] = &['*', '$', '/', '\\'];

/// 회전 작성기 설정
///
/// 파일 이름 패턴은 strftime 형식입니다. `"app.log.%F"`는 `"app.log.2006-01-02"`를 만듭니다.
/// - `%F` 년-월-일
/// - `%Y` 년, `%m` 월, `%d` 일
/// - `%H` 시, `%M` 분
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateOptions {
    /// 파일 출력 디렉토리
    pub out_dir: PathBuf,
    /// 파일 이름 패턴
    pub name_pattern: String,
    /// 현재 파일을 가리키는 심볼릭 링크 이름 (유닉스 계열만)
    #[serde(default)]
    pub link_name: Option<String>,
    /// 파일 보관 기간, 0이면 정리하지 않음
    #[serde(default = "default_max_age")]
    pub max_age: Duration,
    /// 만료 파일 정리 간격
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: Duration,
    /// 파일 회전 간격
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval: Duration,
    /// 쓰기 큐 초기 용량 (자동 확장)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 출력 버퍼 크기, 0이면 버퍼 없이 바로 씀
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// 버퍼를 파일로 내보내는 간격
    #[serde(default = "default_flush_interval")]
    pub flush_interval: Duration,
}

fn default_max_age() -> Duration {
    DEFAULT_MAX_AGE
}

fn default_cleanup_interval() -> Duration {
    DEFAULT_CLEANUP_INTERVAL
}

fn default_rotation_interval() -> Duration {
    DEFAULT_ROTATION_INTERVAL
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_flush_interval() -> Duration {
    DEFAULT_FLUSH_INTERVAL
}

impl RotateOptions {
    /// 필수 항목만 지정하고 나머지는 기본값
    pub fn new<P: Into<PathBuf>, S: Into<String>>(out_dir: P, name_pattern: S) -> Self {
        Self {
            out_dir: out_dir.into(),
            name_pattern: name_pattern.into(),
            link_name: None,
            max_age: DEFAULT_MAX_AGE,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    pub fn with_link_name<S: Into<String>>(mut self, link_name: S) -> Self {
        let link_name = link_name.into();
        self.link_name = if link_name.is_empty() { None } else { Some(link_name) };
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// 환경변수에서 설정 로드
    ///
    /// `{prefix}_OUT_DIR`, `{prefix}_NAME_PATTERN`, `{prefix}_LINK_NAME`,
    /// `{prefix}_MAX_AGE_SECS`, `{prefix}_CLEANUP_INTERVAL_SECS`,
    /// `{prefix}_ROTATION_INTERVAL_SECS`, `{prefix}_QUEUE_CAPACITY`,
    /// `{prefix}_BUFFER_SIZE`, `{prefix}_FLUSH_INTERVAL_MS`.
    /// 파싱할 수 없는 값은 무시하고 기본값을 유지합니다.
    pub fn from_env(prefix: &str) -> Self {
        let var = |name: &str| std::env::var(format!("{prefix}_{name}")).ok();

        let mut options = Self::new(
            var("OUT_DIR").unwrap_or_default(),
            var("NAME_PATTERN").unwrap_or_default(),
        );

        if let Some(val) = var("LINK_NAME") {
            options = options.with_link_name(val);
        }

        if let Some(secs) = var("MAX_AGE_SECS").and_then(|v| v.parse().ok()) {
            options.max_age = Duration::from_secs(secs);
        }

        if let Some(secs) = var("CLEANUP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            options.cleanup_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = var("ROTATION_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            options.rotation_interval = Duration::from_secs(secs);
        }

        if let Some(capacity) = var("QUEUE_CAPACITY").and_then(|v| v.parse().ok()) {
            options.queue_capacity = capacity;
        }

        if let Some(size) = var("BUFFER_SIZE").and_then(|v| v.parse().ok()) {
            options.buffer_size = size;
        }

        if let Some(ms) = var("FLUSH_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            options.flush_interval = Duration::from_millis(ms);
        }

        options
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        if self.out_dir.as_os_str().is_empty() {
            return Err(RollingError::config("out_dir is required"));
        }

        if self.name_pattern.is_empty() {
            return Err(RollingError::config("name_pattern is required"));
        }

        if self.name_pattern.contains(FORBIDDEN_PATTERN_CHARS) {
            return Err(RollingError::config(format!(
                "name_pattern must not contain any of `*$/\\`: {}",
                self.name_pattern
            )));
        }

        if StrftimeItems::new(&self.name_pattern).any(|item| matches!(item, Item::Error)) {
            return Err(RollingError::config(format!(
                "name_pattern is not a valid time format: {}",
                self.name_pattern
            )));
        }

        if let Some(link_name) = &self.link_name {
            if link_name.contains(['/', '\\']) {
                return Err(RollingError::config("link_name must be a plain file name"));
            }
        }

        if self.cleanup_interval.is_zero() {
            return Err(RollingError::config("cleanup_interval must be greater than 0"));
        }

        if self.rotation_interval.is_zero() {
            return Err(RollingError::config("rotation_interval must be greater than 0"));
        }

        if self.queue_capacity == 0 {
            return Err(RollingError::config("queue_capacity must be greater than 0"));
        }

        if self.buffer_size > 0 && self.flush_interval.is_zero() {
            return Err(RollingError::config(
                "flush_interval must be greater than 0 when buffer_size is greater than 0",
            ));
        }

        Ok(())
    }

    /// 정리 기능 사용 여부
    #[inline]
    pub fn cleanup_enabled(&self) -> bool {
        !self.max_age.is_zero()
    }
}
