//! 로그 레코드 포매터

use std::io::{self, Write};

use crate::logs::record::Record;

/// 레코드 하나를 바이트 버퍼에 기록하는 포매터
pub trait Formatter: Send + Sync {
    fn format(&self, buf: &mut Vec<u8>, record: &Record) -> io::Result<()>;
}

/// 한 줄 텍스트 포매터
///
/// `2024-01-02 15:04:05.123 [INFO] message` 형식, 대상이 있으면 `[INFO] target: message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for TextFormatter {
    fn format(&self, buf: &mut Vec<u8>, record: &Record) -> io::Result<()> {
        write!(
            buf,
            "{} [{}] ",
            record.time.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level.as_str()
        )?;

        if let Some(target) = &record.target {
            write!(buf, "{target}: ")?;
        }

        buf.extend_from_slice(record.message.as_bytes());
        if !record.message.ends_with('\n') {
            buf.push(b'\n');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::level::Level;
    use chrono::{Local, TimeZone};

    fn fixed_record(level: Level, message: &str) -> Record {
        let time = Local
            .with_ymd_and_hms(2024, 1, 2, 15, 4, 5)
            .earliest()
            .unwrap()
            + chrono::Duration::milliseconds(123);
        Record::new(level, message).with_time(time)
    }

    #[test]
    fn test_text_format() {
        let mut buf = Vec::new();
        TextFormatter::new()
            .format(&mut buf, &fixed_record(Level::Info, "server started"))
            .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2024-01-02 15:04:05.123 [INFO] server started\n"
        );
    }

    #[test]
    fn test_text_format_with_target_and_newline() {
        let mut buf = Vec::new();
        let record = fixed_record(Level::Error, "disk full\n").with_target("storage");
        TextFormatter.format(&mut buf, &record).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2024-01-02 15:04:05.123 [ERROR] storage: disk full\n"
        );
    }
}
