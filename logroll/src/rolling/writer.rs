//! 회전 로그 작성기
//!
//! 호출 스레드는 버퍼를 큐에 넣기만 하고, 전용 작업 스레드 하나가
//! 파일 회전, 쓰기, 동기화를 모두 처리합니다.
//!
//! # 사용 예
//! ```no_run
//! use logroll::{RotateOptions, RotateWriter};
//!
//! let writer = RotateWriter::new(RotateOptions::new("./logs", "app.log.%F"))?;
//! writer.write_str("hello\n")?;
//! writer.close()?;
//! # Ok::<(), logroll::RollingError>(())
//! ```

use chrono::{DateTime, Local};
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::cell::Cell;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, warn};
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{IoContext, Result, RollingError};
use crate::memutil::{BufferHandle, BufferPool};
use crate::rolling::config::RotateOptions;
use crate::rolling::event::{Ack, Event};
use crate::rolling::rotation::RotationEngine;
use crate::syncutil::DoubleQueue;

/// 현재 시각 공급자
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// 시스템 시계
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

thread_local! {
    /// 현재 스레드가 로그 작업 스레드인지 여부
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

/// 작성기 핸들과 작업 스레드가 공유하는 상태
struct Shared {
    options: Arc<RotateOptions>,
    queue: DoubleQueue<Event>,
    closed: AtomicBool,
    /// 작업 스레드가 패닉으로 종료됨
    worker_panicked: AtomicBool,
    has_error: AtomicBool,
    last_error: Mutex<Option<RollingError>>,
    pool: BufferPool,
}

impl Shared {
    fn record_error(&self, err: RollingError) {
        let mut last = self.last_error.lock();
        *last = Some(err);
        self.has_error.store(true, Ordering::Release);
    }

    fn clear_error(&self) {
        if !self.has_error.load(Ordering::Acquire) {
            return;
        }

        let mut last = self.last_error.lock();
        *last = None;
        self.has_error.store(false, Ordering::Release);
    }

    fn last_error(&self) -> Option<RollingError> {
        if !self.has_error.load(Ordering::Acquire) {
            return None;
        }
        self.last_error.lock().clone()
    }

    /// 큐가 닫혀 요청을 넣지 못했을 때의 결과
    fn closed_result(&self) -> Result<()> {
        if self.worker_panicked.load(Ordering::Acquire) {
            Err(RollingError::WorkerGone)
        } else {
            Ok(())
        }
    }
}

struct WriterInner {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriterInner {
    fn close(&self) -> Result<()> {
        let (tx, rx) = channel::bounded(1);
        let result = match self.shared.queue.push(Event::Close(tx)) {
            Ok(()) => rx.recv().unwrap_or(Err(RollingError::WorkerGone)),
            // 이미 닫힘
            Err(_) => self.shared.closed_result(),
        };

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("로그 작업 스레드가 비정상 종료됨");
                return Err(RollingError::WorkerGone);
            }
        }

        result
    }
}

impl Drop for WriterInner {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "로그 작성기 종료 중 에러");
        }
    }
}

/// 시간 기반 회전 로그 작성기
///
/// 복제하면 같은 작성기를 공유하며, 마지막 핸들이 사라질 때 남은 로그를 모두 쓰고 닫습니다.
#[derive(Clone)]
pub struct RotateWriter {
    inner: Arc<WriterInner>,
}

impl RotateWriter {
    pub fn new(options: RotateOptions) -> Result<Self> {
        Self::with_clock(options, SystemClock)
    }

    /// 시각 공급자를 지정하여 생성
    pub fn with_clock<C: Clock>(options: RotateOptions, clock: C) -> Result<Self> {
        options.validate()?;
        std::fs::create_dir_all(&options.out_dir).io_context("로그 디렉토리 생성")?;

        let options = Arc::new(options);
        let shared = Arc::new(Shared {
            queue: DoubleQueue::new(options.queue_capacity),
            options: Arc::clone(&options),
            closed: AtomicBool::new(false),
            worker_panicked: AtomicBool::new(false),
            has_error: AtomicBool::new(false),
            last_error: Mutex::new(None),
            pool: BufferPool::default(),
        });

        let worker = Worker {
            engine: RotationEngine::new(Arc::clone(&options)),
            shared: Arc::clone(&shared),
            clock: Box::new(clock),
            ticker: None,
        };

        let handle = std::thread::Builder::new()
            .name("logroll-worker".into())
            .spawn(move || worker.run())
            .io_context("작업 스레드 생성")?;

        debug!(
            out_dir = %options.out_dir.display(),
            pattern = %options.name_pattern,
            buffer_size = options.buffer_size,
            "회전 로그 작성기 시작됨"
        );

        Ok(Self {
            inner: Arc::new(WriterInner {
                shared,
                worker: Mutex::new(Some(handle)),
            }),
        })
    }

    /// 바이트를 복사하여 큐에 넣음
    ///
    /// 이전 비동기 작업이 실패했고 그 뒤로 쓰기가 성공한 적이 없으면, 데이터는 큐에 넣되
    /// 그 에러를 반환합니다.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let buffer = self.shared().pool.acquire_filled(data);
        self.submit(buffer)?;
        self.result_with_last_error(data.len())
    }

    pub fn write_str(&self, s: &str) -> Result<usize> {
        self.write(s.as_bytes())
    }

    /// 호출자가 채운 공유 버퍼를 그대로 큐에 넣음
    ///
    /// 버퍼의 참조 카운트를 하나 늘리며, 기록 후 작업 스레드가 해제합니다.
    /// 호출자는 자신의 참조를 별도로 해제해야 합니다.
    pub fn write_buffer(&self, buffer: &BufferHandle) -> Result<usize> {
        let len = buffer.object().read().len();
        buffer.inc_ref();
        self.submit(Arc::clone(buffer))?;
        self.result_with_last_error(len)
    }

    /// 지금까지 넣은 로그를 파일에 동기화하고 완료를 기다림
    ///
    /// 파일을 한 번도 열지 않았거나 이미 닫혔으면 아무 일도 하지 않습니다.
    /// 작업 스레드가 패닉으로 종료되었으면 [`RollingError::WorkerGone`]을 반환합니다.
    pub fn sync(&self) -> Result<()> {
        let (tx, rx) = channel::bounded(1);
        match self.shared().queue.push(Event::Sync(Some(tx))) {
            Ok(()) => rx.recv().unwrap_or(Err(RollingError::WorkerGone)),
            Err(_) => self.shared().closed_result(),
        }
    }

    /// 남은 로그를 모두 쓰고 파일을 닫음, 여러 번 호출해도 안전
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }

    /// 마지막 비동기 작업 에러
    pub fn last_error(&self) -> Option<RollingError> {
        self.shared().last_error()
    }

    pub fn is_closed(&self) -> bool {
        self.shared().closed.load(Ordering::Acquire)
    }

    /// 공유 버퍼 대여용 풀
    pub fn pool(&self) -> &BufferPool {
        &self.shared().pool
    }

    pub fn options(&self) -> &RotateOptions {
        &self.shared().options
    }

    fn shared(&self) -> &Shared {
        &self.inner.shared
    }

    fn submit(&self, buffer: BufferHandle) -> Result<()> {
        self.shared().queue.push(Event::Write(buffer)).map_err(|closed| {
            closed.into_inner().discard();
            RollingError::Closed
        })
    }

    fn result_with_last_error(&self, len: usize) -> Result<usize> {
        match self.last_error() {
            Some(err) => Err(err),
            None => Ok(len),
        }
    }
}

impl std::fmt::Debug for RotateWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotateWriter")
            .field("out_dir", &self.options().out_dir)
            .field("name_pattern", &self.options().name_pattern)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// 작업 스레드 자신이 남긴 로그는 버립니다.
///
/// 작성기를 프로세스의 `tracing` 출력으로 쓸 때, 작업 스레드의 에러 로그가 같은 큐로
/// 되돌아가 실패와 로그가 끝없이 반복되지 않게 합니다.
impl io::Write for &RotateWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if on_worker_thread() {
            return Ok(buf.len());
        }
        RotateWriter::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        if on_worker_thread() {
            return Ok(());
        }
        self.sync().map_err(io::Error::from)
    }
}

impl io::Write for RotateWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}

impl<'a> MakeWriter<'a> for RotateWriter {
    type Writer = &'a RotateWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

/// 플러시 타이머
struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn start(shared: Arc<Shared>) -> io::Result<Self> {
        let interval = shared.options.flush_interval;
        let (stop, stop_rx) = channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("logroll-flush".into())
            .spawn(move || {
                let tick = channel::tick(interval);
                loop {
                    channel::select! {
                        recv(tick) -> _ => {
                            if shared.queue.push(Event::Sync(None)).is_err() {
                                break;
                            }
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
            })?;

        Ok(Self { stop, handle })
    }

    fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}

/// 작업 스레드 상태
struct Worker {
    engine: RotationEngine,
    shared: Arc<Shared>,
    clock: Box<dyn Clock>,
    ticker: Option<Ticker>,
}

impl Worker {
    fn run(mut self) {
        ON_WORKER.with(|w| w.set(true));

        while let Some(event) = self.shared.queue.pop() {
            match event {
                Event::Write(buffer) => self.handle_write(buffer),
                Event::Sync(ack) => {
                    let result = self.handle_sync();
                    if let Some(ack) = ack {
                        let _ = ack.send(result);
                    }
                }
                Event::Close(ack) => {
                    self.shutdown(ack);
                    return;
                }
            }
        }
    }

    fn handle_write(&mut self, buffer: BufferHandle) {
        let result = self.write_buffer(&buffer);
        buffer.dec_ref();

        match result {
            Ok(()) => self.shared.clear_error(),
            Err(e) => {
                error!(error = %e, "로그 쓰기 실패");
                self.shared.record_error(e);
            }
        }
    }

    fn write_buffer(&mut self, buffer: &BufferHandle) -> Result<()> {
        self.engine.ensure_rotated(self.clock.now())?;

        if self.ticker.is_none() && self.engine.is_buffered() {
            match Ticker::start(Arc::clone(&self.shared)) {
                Ok(ticker) => self.ticker = Some(ticker),
                Err(e) => warn!(error = %e, "플러시 타이머 시작 실패"),
            }
        }

        let bytes = buffer.object().read();
        self.engine.write(&bytes)
    }

    fn handle_sync(&mut self) -> Result<()> {
        let result = self.engine.sync();
        if let Err(e) = &result {
            warn!(error = %e, "로그 동기화 실패");
        }
        result
    }

    /// 큐를 닫고 남은 이벤트를 모두 처리한 뒤 파일을 닫음
    fn shutdown(&mut self, ack: Ack) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.queue.close();

        let mut pending_acks: Vec<Ack> = Vec::new();
        while let Some(event) = self.shared.queue.try_pop() {
            match event {
                Event::Write(buffer) => self.handle_write(buffer),
                Event::Sync(Some(ack)) => {
                    let _ = ack.send(self.handle_sync());
                }
                Event::Sync(None) => {}
                Event::Close(ack) => pending_acks.push(ack),
            }
        }

        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }

        let result = self.engine.close();
        if let Err(e) = &result {
            error!(error = %e, "로그 파일 닫기 실패");
        }

        debug!(file = ?self.engine.state().file_name, "회전 로그 작성기 종료됨");

        let _ = ack.send(result);
        for ack in pending_acks {
            let _ = ack.send(Ok(()));
        }
    }
}

/// 패닉으로 풀려날 때 큐를 닫고 남은 이벤트를 버림
///
/// 버린 이벤트의 응답 채널이 닫히므로 기다리던 호출자는 `WorkerGone`을 받습니다.
impl Drop for Worker {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }

        error!("로그 작업 스레드 패닉, 남은 이벤트를 버림");
        self.shared.worker_panicked.store(true, Ordering::Release);
        self.shared.closed.store(true, Ordering::Release);
        self.shared.queue.close();

        while let Some(event) = self.shared.queue.try_pop() {
            event.discard();
        }

        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}
