//! 로그 수신기 통합
//!
//! 레코드를 포매팅하여 회전 작성기로 보내는 파일 수신기를 제공합니다.

pub mod file_sink;
pub mod formatter;
pub mod level;
pub mod record;
pub mod sink;

pub use file_sink::FileSink;
pub use formatter::{Formatter, TextFormatter};
pub use level::Level;
pub use record::Record;
pub use sink::Sink;
