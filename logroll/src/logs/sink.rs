//! 로그 수신기

use crate::logs::record::Record;

/// 포매팅된 레코드를 최종 출력으로 보내는 수신기
pub trait Sink: Send + Sync {
    /// 레코드 처리, 실패는 내부에서 기록하고 삼킴
    fn handle(&self, record: &Record);

    /// 수신기 종료, 여러 번 호출해도 안전해야 함
    fn close(&self);
}
