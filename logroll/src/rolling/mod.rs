//! 시간 기반 파일 회전
//!
//! - [`config`]: 작성기 설정
//! - [`helper`]: 구간 시각 계산, 파일 이름 렌더링, glob 변환
//! - [`stream`]: 버퍼/무버퍼 출력 스트림
//! - [`rotation`]: 회전 상태와 만료 파일 정리
//! - [`writer`]: 큐와 작업 스레드를 묶은 작성기

pub mod config;
pub mod event;
pub mod helper;
pub mod rotation;
pub mod stream;
pub mod writer;

pub use config::RotateOptions;
pub use rotation::{RotationEngine, RotationState};
pub use stream::{BufferedStream, OutputStream, UnbufferedStream};
pub use writer::{Clock, RotateWriter, SystemClock};
