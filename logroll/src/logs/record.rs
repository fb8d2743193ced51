//! 로그 레코드

use chrono::{DateTime, Local};

use crate::logs::level::Level;

/// 텍스트 로그 레코드
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Local>,
    pub level: Level,
    /// 로그를 남긴 모듈 경로 등
    pub target: Option<String>,
    pub message: String,
}

impl Record {
    pub fn new<S: Into<String>>(level: Level, message: S) -> Self {
        Self {
            time: Local::now(),
            level,
            target: None,
            message: message.into(),
        }
    }

    pub fn with_time(mut self, time: DateTime<Local>) -> Self {
        self.time = time;
        self
    }

    pub fn with_target<S: Into<String>>(mut self, target: S) -> Self {
        self.target = Some(target.into());
        self
    }
}
