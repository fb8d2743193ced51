//! 작업 스레드로 전달되는 이벤트

use crossbeam::channel::Sender;

use crate::error::Result;
use crate::memutil::BufferHandle;

/// 동기 요청의 결과를 돌려받는 일회성 채널
pub type Ack = Sender<Result<()>>;

/// 작업 큐 이벤트
pub enum Event {
    /// 버퍼 내용을 파일에 씀, 처리 후 참조 하나를 해제
    Write(BufferHandle),
    /// 출력 스트림 동기화, 플러시 타이머가 보낸 요청은 응답 채널이 없음
    Sync(Option<Ack>),
    /// 남은 이벤트를 모두 처리한 뒤 종료
    Close(Ack),
}

impl Event {
    /// 처리하지 못한 이벤트의 자원 반환
    pub fn discard(self) {
        if let Event::Write(buffer) = self {
            buffer.dec_ref();
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Write(buffer) => f
                .debug_tuple("Write")
                .field(&buffer.object().read().len())
                .finish(),
            Event::Sync(ack) => f.debug_tuple("Sync").field(&ack.is_some()).finish(),
            Event::Close(_) => f.write_str("Close"),
        }
    }
}
