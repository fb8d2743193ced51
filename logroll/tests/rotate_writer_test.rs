//! 회전 작성기 통합 테스트

use chrono::{DateTime, Local, TimeZone};
use logroll::rolling::helper::generate_file_name;
use logroll::{Clock, RollingError, RotateOptions, RotateWriter};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

const DAY: Duration = Duration::from_secs(24 * 3600);

/// 테스트에서 직접 움직이는 시계
#[derive(Clone)]
struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}

fn at(day: u32, hour: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, day, hour, 0, 0).earliest().unwrap()
}

fn today_file(dir: &Path, pattern: &str) -> std::path::PathBuf {
    dir.join(generate_file_name(pattern, &Local::now()).unwrap())
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod rotation_tests {
    use super::*;

    #[test]
    fn test_same_day_writes_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(at(10, 9));
        let writer =
            RotateWriter::with_clock(RotateOptions::new(dir.path(), "app.%F"), clock.clone())
                .unwrap();

        writer.write_str("morning\n").unwrap();
        writer.sync().unwrap();
        clock.set(at(10, 21));
        writer.write_str("evening\n").unwrap();
        writer.close().unwrap();

        assert_eq!(file_names(dir.path()), vec!["app.2024-05-10"]);
        let content = fs::read_to_string(dir.path().join("app.2024-05-10")).unwrap();
        assert_eq!(content, "morning\nevening\n");
    }

    #[test]
    fn test_next_day_starts_new_file_without_loss() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(at(10, 23));
        let writer =
            RotateWriter::with_clock(RotateOptions::new(dir.path(), "app.%F"), clock.clone())
                .unwrap();

        for i in 0..100 {
            writer.write_str(&format!("day1 {i}\n")).unwrap();
        }
        writer.sync().unwrap();

        clock.set(at(11, 0));
        for i in 0..100 {
            writer.write_str(&format!("day2 {i}\n")).unwrap();
        }
        writer.close().unwrap();

        assert_eq!(
            file_names(dir.path()),
            vec!["app.2024-05-10", "app.2024-05-11"]
        );
        let day1 = fs::read_to_string(dir.path().join("app.2024-05-10")).unwrap();
        let day2 = fs::read_to_string(dir.path().join("app.2024-05-11")).unwrap();
        assert_eq!(day1.lines().count(), 100);
        assert_eq!(day2.lines().count(), 100);
        assert!(day1.lines().all(|l| l.starts_with("day1")));
        assert!(day2.lines().all(|l| l.starts_with("day2")));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_points_at_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(at(10, 9));
        let options = RotateOptions::new(dir.path(), "app.%F").with_link_name("app");
        let writer = RotateWriter::with_clock(options, clock.clone()).unwrap();

        writer.write_str("a\n").unwrap();
        writer.sync().unwrap();
        assert_eq!(
            fs::read_link(dir.path().join("app")).unwrap(),
            Path::new("app.2024-05-10")
        );

        clock.set(at(11, 9));
        writer.write_str("b\n").unwrap();
        writer.close().unwrap();
        assert_eq!(
            fs::read_link(dir.path().join("app")).unwrap(),
            Path::new("app.2024-05-11")
        );
        assert_eq!(fs::read_to_string(dir.path().join("app")).unwrap(), "b\n");
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_close_twice_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotateWriter::new(RotateOptions::new(dir.path(), "app.%F")).unwrap();
        writer.write_str("x\n").unwrap();

        assert!(writer.close().is_ok());
        assert!(writer.close().is_ok());
        assert!(writer.is_closed());
    }

    #[test]
    fn test_concurrent_close_from_clones() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotateWriter::new(RotateOptions::new(dir.path(), "app.%F")).unwrap();
        writer.write_str("x\n").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let writer = writer.clone();
                thread::spawn(move || writer.close())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }

        assert_eq!(fs::read_to_string(today_file(dir.path(), "app.%F")).unwrap(), "x\n");
    }

    #[test]
    fn test_sync_before_any_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotateWriter::new(RotateOptions::new(dir.path(), "app.%F")).unwrap();

        assert!(writer.sync().is_ok());
        assert!(file_names(dir.path()).is_empty());
        writer.close().unwrap();
        assert!(file_names(dir.path()).is_empty());
    }

    #[test]
    fn test_creates_missing_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = RotateWriter::new(RotateOptions::new(&nested, "app.%F")).unwrap();
        writer.write_str("nested\n").unwrap();
        writer.close().unwrap();

        assert!(today_file(&nested, "app.%F").exists());
    }

    #[test]
    fn test_unbuffered_writes_visible_after_sync() {
        let dir = tempfile::tempdir().unwrap();
        let options = RotateOptions::new(dir.path(), "app.%F").with_buffer_size(0);
        let writer = RotateWriter::new(options).unwrap();

        writer.write_str("now\n").unwrap();
        writer.sync().unwrap();
        assert_eq!(fs::read_to_string(today_file(dir.path(), "app.%F")).unwrap(), "now\n");
        writer.close().unwrap();
    }

    #[test]
    fn test_flush_ticker_writes_buffered_data() {
        let dir = tempfile::tempdir().unwrap();
        let options = RotateOptions::new(dir.path(), "app.%F")
            .with_flush_interval(Duration::from_millis(20));
        let writer = RotateWriter::new(options).unwrap();
        let path = today_file(dir.path(), "app.%F");

        writer.write_str("ticked\n").unwrap();

        let mut content = String::new();
        for _ in 0..100 {
            thread::sleep(Duration::from_millis(10));
            content = fs::read_to_string(&path).unwrap_or_default();
            if !content.is_empty() {
                break;
            }
        }
        assert_eq!(content, "ticked\n");
        writer.close().unwrap();
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_open_failure_is_reported_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(at(10, 9));
        let writer =
            RotateWriter::with_clock(RotateOptions::new(dir.path(), "app.%F"), clock).unwrap();

        // 같은 이름의 디렉토리가 있으면 파일을 열 수 없음
        let blocker = dir.path().join("app.2024-05-10");
        fs::create_dir(&blocker).unwrap();

        assert!(writer.write_str("lost\n").is_ok());
        writer.sync().unwrap();
        assert!(matches!(writer.last_error(), Some(RollingError::Io { .. })));
        assert!(matches!(writer.write_str("lost\n"), Err(RollingError::Io { .. })));
        writer.sync().unwrap();

        fs::remove_dir(&blocker).unwrap();
        let _ = writer.write_str("kept\n");
        writer.sync().unwrap();
        assert!(writer.last_error().is_none());
        assert_eq!(writer.write_str("also kept\n").unwrap(), 10);
        writer.close().unwrap();

        let content = fs::read_to_string(&blocker).unwrap();
        assert_eq!(content, "kept\nalso kept\n");
    }

    /// 시각을 물으면 패닉하는 시계
    struct PanicClock;

    impl Clock for PanicClock {
        fn now(&self) -> DateTime<Local> {
            panic!("clock unavailable");
        }
    }

    #[test]
    fn test_dead_worker_reports_worker_gone() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            RotateWriter::with_clock(RotateOptions::new(dir.path(), "app.%F"), PanicClock).unwrap();

        writer.write_str("never written\n").unwrap();

        // 작업 스레드가 죽어도 동기화가 멈추지 않아야 함
        let (tx, rx) = crossbeam::channel::bounded(1);
        let syncer = writer.clone();
        thread::spawn(move || {
            let _ = tx.send(syncer.sync());
        });
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(RollingError::WorkerGone)));

        assert!(writer.is_closed());
        assert!(matches!(writer.write_str("late\n"), Err(RollingError::Closed)));
        assert!(matches!(writer.close(), Err(RollingError::WorkerGone)));
    }

    #[test]
    fn test_write_after_close_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotateWriter::new(RotateOptions::new(dir.path(), "app.%F")).unwrap();
        writer.close().unwrap();

        assert!(matches!(writer.write_str("late"), Err(RollingError::Closed)));
        let buffer = writer.pool().acquire_filled(b"late");
        assert!(writer.write_buffer(&buffer).is_err());
        assert_eq!(buffer.ref_count(), 1);
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_producers_keep_their_order() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 2_000;

        let dir = tempfile::tempdir().unwrap();
        let options = RotateOptions::new(dir.path(), "app.%F").with_queue_capacity(16);
        let writer = RotateWriter::new(options).unwrap();

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let writer = writer.clone();
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        writer.write_str(&format!("{p} {seq}\n")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        writer.close().unwrap();

        let content = fs::read_to_string(today_file(dir.path(), "app.%F")).unwrap();
        let mut next: HashMap<usize, usize> = HashMap::new();
        let mut total = 0;
        for line in content.lines() {
            let (p, seq) = line.split_once(' ').unwrap();
            let (p, seq): (usize, usize) = (p.parse().unwrap(), seq.parse().unwrap());
            let expected = next.entry(p).or_insert(0);
            assert_eq!(seq, *expected, "producer {p} out of order");
            *expected += 1;
            total += 1;
        }
        assert_eq!(total, PRODUCERS * PER_PRODUCER);
    }

    #[test]
    fn test_pooled_buffers_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotateWriter::new(RotateOptions::new(dir.path(), "app.%F")).unwrap();

        for _ in 0..10 {
            writer.write_str("one at a time\n").unwrap();
            writer.sync().unwrap();
        }
        let stats = writer.pool().stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.reused, 9);
        writer.close().unwrap();
    }
}

#[cfg(test)]
mod cleanup_tests {
    use super::*;

    fn aged(path: &Path, age: Duration) {
        File::create(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[test]
    fn test_expired_files_removed_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let expired = dir.path().join("app.2000-01-01");
        let recent = dir.path().join("app.2000-01-02");
        let foreign = dir.path().join("db.2000-01-01");
        aged(&expired, 30 * DAY);
        aged(&recent, DAY);
        aged(&foreign, 30 * DAY);

        let options = RotateOptions::new(dir.path(), "app.%F").with_max_age(7 * DAY);
        let writer = RotateWriter::new(options).unwrap();
        writer.write_str("trigger\n").unwrap();
        writer.close().unwrap();

        assert!(!expired.exists());
        assert!(recent.exists());
        assert!(foreign.exists());
        assert!(today_file(dir.path(), "app.%F").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_never_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.log");
        aged(&target, 30 * DAY);
        let link = dir.path().join("app.link-to-target");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let options = RotateOptions::new(dir.path(), "app.%F").with_max_age(7 * DAY);
        let writer = RotateWriter::new(options).unwrap();
        writer.write_str("trigger\n").unwrap();
        writer.close().unwrap();

        assert!(fs::symlink_metadata(&link).is_ok());
        assert!(target.exists());
    }

    #[test]
    fn test_zero_max_age_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let expired = dir.path().join("app.2000-01-01");
        aged(&expired, 365 * DAY);

        let options = RotateOptions::new(dir.path(), "app.%F").with_max_age(Duration::ZERO);
        let writer = RotateWriter::new(options).unwrap();
        writer.write_str("trigger\n").unwrap();
        writer.close().unwrap();

        assert!(expired.exists());
    }
}

#[cfg(test)]
mod tracing_tests {
    use super::*;

    #[test]
    fn test_as_tracing_writer() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotateWriter::new(RotateOptions::new(dir.path(), "app.%F")).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(user = "kim", "player joined");
        });
        writer.close().unwrap();

        let content = fs::read_to_string(today_file(dir.path(), "app.%F")).unwrap();
        assert!(content.contains("player joined"));
        assert!(content.contains("user=\"kim\""));
    }
}
