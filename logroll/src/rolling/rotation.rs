//! 파일 회전 및 만료 파일 정리
//!
//! 작업 스레드가 독점하는 회전 상태를 관리합니다.
//! 쓰기 직전마다 `ensure_rotated()`를 호출하며, 시간 구간이 바뀌어 파일 이름이 달라졌을 때만
//! 실제로 새 파일을 엽니다.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::error::{IoContext, Result};
use crate::rolling::config::RotateOptions;
use crate::rolling::helper::{
    base_time, generate_file_name, list_files, next_boundary, to_glob_pattern,
};
use crate::rolling::stream::{new_stream, OutputStream};

/// 회전 상태 (작업 스레드 전용)
#[derive(Debug, Default, Clone)]
pub struct RotationState {
    /// 현재 열린 파일 이름
    pub file_name: Option<String>,
    /// 다음 회전 검사 시각
    pub next_rotate_time: Option<DateTime<Local>>,
    /// 다음 정리 시각
    pub next_cleanup_time: Option<DateTime<Local>>,
}

/// 회전 엔진
pub struct RotationEngine {
    options: Arc<RotateOptions>,
    glob_pattern: String,
    state: RotationState,
    stream: Option<Box<dyn OutputStream>>,
    /// 정리 작업 중복 실행 방지 플래그
    cleaning: Arc<AtomicBool>,
    cleanup_handle: Option<JoinHandle<usize>>,
}

impl RotationEngine {
    pub fn new(options: Arc<RotateOptions>) -> Self {
        let glob_pattern = to_glob_pattern(&options.name_pattern);
        Self {
            options,
            glob_pattern,
            state: RotationState::default(),
            stream: None,
            cleaning: Arc::new(AtomicBool::new(false)),
            cleanup_handle: None,
        }
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    /// 현재 파일 전체 경로
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state
            .file_name
            .as_ref()
            .map(|name| self.options.out_dir.join(name))
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_buffered(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_buffered())
    }

    /// `now` 시각에 맞는 파일이 열려 있도록 보장
    ///
    /// 새 파일을 열었으면 `true`를 반환합니다.
    pub fn ensure_rotated(&mut self, now: DateTime<Local>) -> Result<bool> {
        if self.stream.is_some() {
            if let Some(next) = self.state.next_rotate_time {
                if now < next {
                    return Ok(false);
                }
            }
        }

        let base = base_time(&now, self.options.rotation_interval);
        let next_rotate_time = next_boundary(&base, self.options.rotation_interval);
        let file_name = generate_file_name(&self.options.name_pattern, &base)?;

        if self.stream.is_some() && self.state.file_name.as_deref() == Some(file_name.as_str()) {
            self.state.next_rotate_time = next_rotate_time;
            return Ok(false);
        }

        let path = self.options.out_dir.join(&file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .io_context("로그 파일 열기")?;

        match self.stream.as_mut() {
            Some(stream) => {
                if let Err(e) = stream.reset(file) {
                    warn!(
                        previous = ?self.state.file_name,
                        error = %e,
                        "이전 로그 파일 플러시 실패"
                    );
                }
            }
            None => self.stream = Some(new_stream(file, self.options.buffer_size)),
        }

        debug!(path = %path.display(), "로그 파일 회전됨");

        self.state.file_name = Some(file_name.clone());
        self.state.next_rotate_time = next_rotate_time;

        self.update_link(&file_name);
        self.maybe_cleanup(now);

        Ok(true)
    }

    /// 현재 스트림에 씀
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.write_all(data).io_context("로그 쓰기"),
            None => Ok(()),
        }
    }

    /// 스트림 동기화
    ///
    /// 파일이 외부에서 삭제되었으면 스트림을 버리고 다음 쓰기에서 다시 만듭니다.
    pub fn sync(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };

        if !stream.is_valid() {
            warn!(file = ?self.state.file_name, "로그 파일이 삭제됨, 다음 쓰기에서 다시 생성");
            let _ = stream.close();
            self.stream = None;
            return Ok(());
        }

        stream.sync().io_context("로그 동기화")
    }

    /// 스트림을 닫고 진행 중인 정리 작업을 기다림
    pub fn close(&mut self) -> Result<()> {
        let result = match self.stream.take() {
            Some(mut stream) => stream.close().io_context("로그 파일 닫기"),
            None => Ok(()),
        };

        if let Some(handle) = self.cleanup_handle.take() {
            let _ = handle.join();
        }

        result
    }

    /// 현재 파일을 가리키는 심볼릭 링크 갱신 (실패해도 무시)
    #[cfg(unix)]
    fn update_link(&self, file_name: &str) {
        let Some(link_name) = self.options.link_name.as_deref() else {
            return;
        };

        let link = self.options.out_dir.join(link_name);
        let tmp = self.options.out_dir.join(format!("{link_name}.link"));

        // 이전에 남은 임시 링크가 있으면 생성이 실패하므로 먼저 제거
        let _ = fs::remove_file(&tmp);

        if let Err(e) = std::os::unix::fs::symlink(file_name, &tmp) {
            warn!(link = %tmp.display(), error = %e, "심볼릭 링크 생성 실패");
            return;
        }

        if let Err(e) = fs::rename(&tmp, &link) {
            warn!(link = %link.display(), error = %e, "심볼릭 링크 교체 실패");
            let _ = fs::remove_file(&tmp);
        }
    }

    #[cfg(not(unix))]
    fn update_link(&self, _file_name: &str) {}

    fn maybe_cleanup(&mut self, now: DateTime<Local>) {
        if !self.options.cleanup_enabled() {
            return;
        }

        if let Some(next) = self.state.next_cleanup_time {
            if now < next {
                return;
            }
        }

        let base = base_time(&now, self.options.cleanup_interval);
        self.state.next_cleanup_time = next_boundary(&base, self.options.cleanup_interval);

        if let Some(handle) = self.spawn_cleanup(now) {
            if let Some(previous) = self.cleanup_handle.replace(handle) {
                let _ = previous.join();
            }
        }
    }

    /// 만료 파일 정리를 별도 스레드에서 시작
    ///
    /// 이미 정리 중이면 `None`.
    pub fn spawn_cleanup(&self, now: DateTime<Local>) -> Option<JoinHandle<usize>> {
        if self
            .cleaning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("이미 정리 작업이 진행 중");
            return None;
        }

        let cutoff = SystemTime::from(now)
            .checked_sub(self.options.max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let dir = self.options.out_dir.clone();
        let glob_pattern = self.glob_pattern.clone();
        let current = self.current_path();
        let cleaning = Arc::clone(&self.cleaning);

        let spawned = std::thread::Builder::new()
            .name("logroll-cleanup".into())
            .spawn(move || {
                let removed = sweep_expired(&dir, &glob_pattern, current.as_deref(), cutoff);
                cleaning.store(false, Ordering::Release);
                removed
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "정리 스레드 생성 실패");
                self.cleaning.store(false, Ordering::Release);
                None
            }
        }
    }
}

impl Drop for RotationEngine {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// `dir`에서 `glob_pattern`과 일치하고 `cutoff`보다 오래된 일반 파일을 삭제
///
/// 현재 파일과 일반 파일이 아닌 항목(심볼릭 링크, 디렉토리)은 건너뜁니다.
/// 삭제한 파일 수를 반환합니다.
pub fn sweep_expired(
    dir: &Path,
    glob_pattern: &str,
    current: Option<&Path>,
    cutoff: SystemTime,
) -> usize {
    let files = match list_files(dir, glob_pattern) {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "로그 파일 목록 조회 실패");
            return 0;
        }
    };

    let mut removed = 0;
    for path in files {
        if current.is_some_and(|c| c == path) {
            continue;
        }

        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "파일 메타데이터 읽기 실패");
                continue;
            }
        };

        if !metadata.file_type().is_file() {
            continue;
        }

        let expired = metadata.modified().map(|mtime| mtime < cutoff).unwrap_or(false);
        if !expired {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                debug!(path = %path.display(), "만료된 로그 파일 삭제됨");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "로그 파일 삭제 실패");
            }
        }
    }

    if removed > 0 {
        info!(dir = %dir.display(), removed, "만료된 로그 파일 정리 완료");
    }

    removed
}
