//! 통합 에러 처리
//!
//! 회전 로그 작성기 전체에서 사용하는 에러 타입을 정의합니다.
//!
//! # 에러 분류
//! - **설정 오류**: 생성 시점에 즉시 실패, 재시도하지 않음
//! - **I/O 오류**: 파일 생성/쓰기/동기화 실패, "마지막 에러"로 기록되어 다음 호출자에게 전달
//! - **종료 오류**: 닫힌 작성기에 대한 쓰기

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// 회전 로그 작성기 에러 타입
///
/// "마지막 에러"로 저장되어 여러 호출자에게 복제되므로 `Clone`을 구현합니다.
#[derive(Error, Debug, Clone)]
pub enum RollingError {
    #[error("설정 오류: {message}")]
    Config { message: String },

    #[error("작성기가 이미 닫힘")]
    Closed,

    #[error("I/O 오류 ({context}): {source}")]
    Io {
        context: &'static str,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("작업 스레드가 응답 없이 종료됨")]
    WorkerGone,
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, RollingError>;

impl RollingError {
    /// 설정 오류 생성
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// I/O 오류 생성
    pub fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io {
            context,
            source: Arc::new(source),
        }
    }

    /// 설정 오류인지 확인
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// `io::Result`에 컨텍스트를 붙여 `RollingError`로 변환
pub(crate) trait IoContext<T> {
    fn io_context(self, context: &'static str) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| RollingError::io(context, e))
    }
}

impl From<RollingError> for io::Error {
    fn from(err: RollingError) -> Self {
        let kind = match &err {
            RollingError::Closed => io::ErrorKind::BrokenPipe,
            RollingError::Config { .. } => io::ErrorKind::InvalidInput,
            RollingError::Io { source, .. } => source.kind(),
            RollingError::WorkerGone => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_context_keeps_kind() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = result.io_context("파일 열기").unwrap_err();

        assert!(err.to_string().contains("파일 열기"));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_error_is_cloneable() {
        let err = RollingError::io("쓰기", io::Error::new(io::ErrorKind::Other, "disk full"));
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
        assert!(RollingError::config("x").is_config());
        assert!(!RollingError::Closed.is_config());
    }
}
