//! 시간 기반 회전 로그 작성기
//!
//! 여러 스레드에서 들어오는 로그를 전용 작업 스레드 하나가 시간 구간별 파일로 기록합니다.
//!
//! # 주요 기능
//! - **시간 구간 회전**: 이름 패턴(strftime)과 회전 간격으로 파일 이름 결정
//! - **만료 파일 정리**: 보관 기간이 지난 파일을 백그라운드에서 삭제
//! - **현재 파일 링크**: 고정 이름의 심볼릭 링크가 항상 현재 파일을 가리킴
//! - **버퍼 재사용**: 참조 카운트 버퍼 풀로 레코드당 할당 최소화
//! - **종료 시 유실 없음**: 닫기 전에 큐에 남은 로그를 모두 기록
//!
//! # 사용 예시
//! ```no_run
//! use logroll::{RotateOptions, RotateWriter};
//! use std::time::Duration;
//!
//! let options = RotateOptions::new("./logs", "app.log.%F")
//!     .with_link_name("app.log")
//!     .with_max_age(Duration::from_secs(7 * 24 * 3600));
//!
//! let writer = RotateWriter::new(options)?;
//! writer.write_str("서버 시작\n")?;
//! writer.close()?;
//! # Ok::<(), logroll::RollingError>(())
//! ```
//!
//! `tracing-subscriber`의 출력으로도 사용할 수 있습니다.
//! ```no_run
//! # let writer = logroll::RotateWriter::new(logroll::RotateOptions::new("./logs", "app.%F")).unwrap();
//! tracing_subscriber::fmt().with_writer(writer).with_ansi(false).init();
//! ```

pub mod error;
pub mod logs;
pub mod memutil;
pub mod rolling;
pub mod syncutil;

pub use error::{Result, RollingError};
pub use logs::{FileSink, Formatter, Level, Record, Sink, TextFormatter};
pub use memutil::{BufferHandle, BufferPool};
pub use rolling::{Clock, RotateOptions, RotateWriter, SystemClock};
pub use syncutil::{DoubleQueue, WaitQueue};
