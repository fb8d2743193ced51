//! 파일 로그 수신기
//!
//! 모든 레코드를 쓰는 일반 파일과 경고 이상만 쓰는 에러 파일을 함께 관리합니다.
//! 레코드는 한 번만 포매팅하고, 같은 공유 버퍼를 두 작성기에 넘깁니다.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::error;

use crate::error::Result;
use crate::logs::formatter::{Formatter, TextFormatter};
use crate::logs::record::Record;
use crate::logs::sink::Sink;
use crate::memutil::{BufferPool, BufferPoolConfig};
use crate::rolling::{RotateOptions, RotateWriter};

/// 일반 파일 작성기 큐 초기 용량
pub const NORMAL_QUEUE_CAPACITY: usize = 2048;
/// 에러 파일 작성기 큐 초기 용량
pub const ERROR_QUEUE_CAPACITY: usize = 256;
/// 파일 출력 버퍼 크기 (128KB)
pub const FILE_BUFFER_SIZE: usize = 128 * 1024;
/// 파일 보관 기간 (14일)
pub const FILE_MAX_AGE: Duration = Duration::from_secs(14 * 24 * 3600);

const DAY: Duration = Duration::from_secs(24 * 3600);

/// 파일 수신기용 작성기 설정
///
/// 이름 패턴은 `<file_name>.%F`, 링크 이름은 `<file_name>`입니다.
pub fn file_sink_options(out_dir: &Path, file_name: &str, queue_capacity: usize) -> RotateOptions {
    RotateOptions::new(out_dir, format!("{file_name}.%F"))
        .with_link_name(file_name)
        .with_max_age(FILE_MAX_AGE)
        .with_cleanup_interval(DAY)
        .with_rotation_interval(DAY)
        .with_queue_capacity(queue_capacity)
        .with_buffer_size(FILE_BUFFER_SIZE)
        .with_flush_interval(Duration::from_secs(5))
}

/// 파일 로그 수신기
pub struct FileSink {
    formatter: Box<dyn Formatter>,
    pool: BufferPool,
    normal_writer: RotateWriter,
    error_writer: RotateWriter,
    closed: AtomicBool,
}

impl FileSink {
    /// 텍스트 포매터를 사용하는 수신기 생성
    pub fn new<P: Into<PathBuf>>(out_dir: P, file_name: &str) -> Result<Self> {
        Self::with_formatter(out_dir, file_name, Box::new(TextFormatter::new()))
    }

    pub fn with_formatter<P: Into<PathBuf>>(
        out_dir: P,
        file_name: &str,
        formatter: Box<dyn Formatter>,
    ) -> Result<Self> {
        let out_dir = out_dir.into();

        let normal_writer =
            RotateWriter::new(file_sink_options(&out_dir, file_name, NORMAL_QUEUE_CAPACITY))?;
        let error_writer = RotateWriter::new(file_sink_options(
            &out_dir,
            &format!("err_{file_name}"),
            ERROR_QUEUE_CAPACITY,
        ))?;

        Ok(Self {
            formatter,
            pool: BufferPool::new(BufferPoolConfig::default()),
            normal_writer,
            error_writer,
            closed: AtomicBool::new(false),
        })
    }

    pub fn normal_writer(&self) -> &RotateWriter {
        &self.normal_writer
    }

    pub fn error_writer(&self) -> &RotateWriter {
        &self.error_writer
    }

    /// 레코드 포매팅에 쓰는 버퍼 풀
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// 두 작성기 모두 동기화
    pub fn sync(&self) -> Result<()> {
        self.normal_writer.sync()?;
        self.error_writer.sync()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Sink for FileSink {
    fn handle(&self, record: &Record) {
        if self.is_closed() {
            return;
        }

        let buffer = self.pool.acquire();
        buffer.inc_ref();

        let formatted = {
            let mut bytes = buffer.object().write();
            bytes.clear();
            self.formatter.format(&mut bytes, record)
        };

        match formatted {
            Ok(()) => {
                if let Err(e) = self.normal_writer.write_buffer(&buffer) {
                    error!(error = %e, "일반 로그 기록 실패");
                }

                if record.level.is_error_level() {
                    if let Err(e) = self.error_writer.write_buffer(&buffer) {
                        error!(error = %e, "에러 로그 기록 실패");
                    }
                }
            }
            Err(e) => error!(error = %e, "로그 레코드 포매팅 실패"),
        }

        buffer.dec_ref();
    }

    fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Err(e) = self.normal_writer.close() {
            error!(error = %e, "일반 로그 작성기 닫기 실패");
        }

        if let Err(e) = self.error_writer.close() {
            error!(error = %e, "에러 로그 작성기 닫기 실패");
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.close();
    }
}
