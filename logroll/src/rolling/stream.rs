//! 출력 스트림 추상화
//!
//! 버퍼 사용 여부와 관계없이 같은 인터페이스로 파일에 씁니다.
//! 회전 시에는 스트림을 새로 만들지 않고 `reset()`으로 파일만 교체합니다.

use std::fs::File;
use std::io::{self, BufWriter, Write};

/// 회전 대상 출력 스트림
pub trait OutputStream: Write + Send {
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.write_all(s.as_bytes())?;
        Ok(s.len())
    }

    fn is_buffered(&self) -> bool;

    /// 버퍼를 비우고 저장 장치까지 동기화
    fn sync(&mut self) -> io::Result<()>;

    /// 남은 버퍼를 내보내고 닫음
    fn close(&mut self) -> io::Result<()>;

    /// 기존 파일을 내보낸 뒤 `file`로 교체
    ///
    /// 기존 파일의 플러시가 실패해도 교체는 이루어지며, 실패는 반환값으로 알립니다.
    fn reset(&mut self, file: File) -> io::Result<()>;

    /// 파일이 아직 디스크에 존재하는지 확인 (외부에서 삭제되었으면 false)
    fn is_valid(&self) -> bool;
}

/// 버퍼 크기에 맞는 스트림 생성, 0이면 버퍼 없음
pub fn new_stream(file: File, buffer_size: usize) -> Box<dyn OutputStream> {
    if buffer_size > 0 {
        Box::new(BufferedStream::new(file, buffer_size))
    } else {
        Box::new(UnbufferedStream::new(file))
    }
}

#[cfg(unix)]
fn file_exists(file: &File) -> bool {
    use std::os::unix::fs::MetadataExt;
    file.metadata().map(|m| m.nlink() > 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn file_exists(file: &File) -> bool {
    file.metadata().is_ok()
}

/// 내부 버퍼를 거쳐 쓰는 스트림
pub struct BufferedStream {
    writer: BufWriter<File>,
    capacity: usize,
}

impl BufferedStream {
    pub fn new(file: File, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, file),
            capacity,
        }
    }

    /// 아직 파일로 나가지 않은 바이트 수
    pub fn pending(&self) -> usize {
        self.writer.buffer().len()
    }
}

impl Write for BufferedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl OutputStream for BufferedStream {
    fn is_buffered(&self) -> bool {
        true
    }

    fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn reset(&mut self, file: File) -> io::Result<()> {
        let old = std::mem::replace(&mut self.writer, BufWriter::with_capacity(self.capacity, file));
        old.into_inner().map(drop).map_err(|e| e.into_error())
    }

    fn is_valid(&self) -> bool {
        file_exists(self.writer.get_ref())
    }
}

/// 파일에 바로 쓰는 스트림
pub struct UnbufferedStream {
    file: File,
}

impl UnbufferedStream {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl Write for UnbufferedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputStream for UnbufferedStream {
    fn is_buffered(&self) -> bool {
        false
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self, file: File) -> io::Result<()> {
        self.file = file;
        Ok(())
    }

    fn is_valid(&self) -> bool {
        file_exists(&self.file)
    }
}
