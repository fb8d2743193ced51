//! 바이트 버퍼 풀
//!
//! 참조 카운트 버퍼를 재사용하여 로그 한 건마다 발생하는 할당을 줄입니다.
//! - 풀이 비어 있으면 새 버퍼를 할당 (지연 확장)
//! - 마지막 참조가 해제되면 해제 콜백이 버퍼를 풀로 되돌림
//! - 풀이 가득 찼거나 버퍼가 너무 커졌으면 폐기

use crossbeam_queue::SegQueue;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::memutil::ref_object::{RefDestroyer, RefObject};

/// 풀에서 관리하는 공유 버퍼
pub type SharedBuffer = RefObject<RwLock<Vec<u8>>>;

/// 공유 버퍼 핸들
pub type BufferHandle = Arc<SharedBuffer>;

/// 버퍼 풀 설정
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// 풀에 보관할 최대 버퍼 수
    pub max_pool_size: usize,
    /// 새 버퍼의 초기 용량
    pub initial_buffer_size: usize,
    /// 이보다 커진 버퍼는 반환 시 폐기
    pub max_buffer_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 4096,
            initial_buffer_size: 128,
            max_buffer_size: 64 * 1024, // 64KB
        }
    }
}

/// 버퍼 풀 통계
#[derive(Debug, Default)]
pub struct PoolStats {
    /// 새로 할당한 버퍼 수
    pub allocated: AtomicU64,
    /// 재사용한 버퍼 수
    pub reused: AtomicU64,
    /// 풀로 돌아온 버퍼 수
    pub returned: AtomicU64,
    /// 폐기한 버퍼 수
    pub dropped: AtomicU64,
}

/// 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub allocated: u64,
    pub reused: u64,
    pub returned: u64,
    pub dropped: u64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

struct PoolInner {
    pool: SegQueue<BufferHandle>,
    config: BufferPoolConfig,
    stats: PoolStats,
    current_size: AtomicUsize,
}

impl PoolInner {
    /// 해제 콜백에서 호출됨
    fn release(&self, buffer: BufferHandle) {
        let current = self.current_size.load(Ordering::Relaxed);
        if current >= self.config.max_pool_size {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(pool_size = current, "풀이 가득 참, 버퍼 폐기");
            return;
        }

        let capacity = buffer.object().read().capacity();
        if capacity > self.config.max_buffer_size {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(capacity, "버퍼가 너무 큼, 폐기");
            return;
        }

        self.pool.push(buffer);
        self.current_size.fetch_add(1, Ordering::Relaxed);
        self.stats.returned.fetch_add(1, Ordering::Relaxed);
    }
}

/// 참조 카운트 바이트 버퍼 풀
///
/// 복제하면 같은 풀을 공유합니다.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                pool: SegQueue::new(),
                config,
                stats: PoolStats::default(),
                current_size: AtomicUsize::new(0),
            }),
        }
    }

    /// 버퍼 대여
    ///
    /// 반환된 핸들의 참조 카운트는 0입니다. 호출자는 `inc_ref()` 후
    /// 내용을 비우고 나서 채워야 합니다 (재사용 버퍼에 이전 내용이 남아 있을 수 있음).
    pub fn acquire(&self) -> BufferHandle {
        if let Some(buffer) = self.inner.pool.pop() {
            self.inner.current_size.fetch_sub(1, Ordering::Relaxed);
            self.inner.stats.reused.fetch_add(1, Ordering::Relaxed);
            return buffer;
        }

        self.inner.stats.allocated.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<PoolInner> = Arc::downgrade(&self.inner);
        let destroyer: RefDestroyer<RwLock<Vec<u8>>> = Arc::new(move |buffer: BufferHandle| {
            // 풀이 이미 사라졌으면 버퍼는 그대로 해제됨
            if let Some(pool) = weak.upgrade() {
                pool.release(buffer);
            }
        });

        RefObject::new(
            RwLock::new(Vec::with_capacity(self.inner.config.initial_buffer_size)),
            Some(destroyer),
        )
    }

    /// 버퍼를 대여하고 참조 카운트 1, 내용 `data`로 채워 반환
    pub fn acquire_filled(&self, data: &[u8]) -> BufferHandle {
        let buffer = self.acquire();
        buffer.inc_ref();
        {
            let mut bytes = buffer.object().write();
            bytes.clear();
            bytes.extend_from_slice(data);
        }
        buffer
    }

    /// 현재 풀에 보관 중인 버퍼 수
    pub fn idle_count(&self) -> usize {
        self.inner.current_size.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}
