//! 스핀락 기반 조건 변수
//!
//! 상태는 [`SpinMutex`]로 보호하고, 기다리는 쪽만 `parking_lot` 조건 변수에서 잠듭니다.
//! 대기자가 없으면 생산자는 스핀락만 잡고 끝나므로 생산자 쪽 경합이 적을 때 유리합니다.
//!
//! 깨움 유실 방지: 대기자는 `sleep` 뮤텍스를 잡은 채 대기자 수를 올리고 상태를 재확인합니다.
//! 생산자는 상태를 바꾼 뒤 대기자 수를 보고, 0이 아니면 같은 뮤텍스를 잡고 깨웁니다.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::syncutil::spin_lock::{SpinMutex, SpinMutexGuard};

pub struct SpinCond<T> {
    state: SpinMutex<T>,
    sleep: Mutex<()>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl<T> SpinCond<T> {
    pub fn new(state: T) -> Self {
        Self {
            state: SpinMutex::new(state),
            sleep: Mutex::new(()),
            cond: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// 상태 락 획득
    #[inline]
    pub fn lock(&self) -> SpinMutexGuard<'_, T> {
        self.state.lock()
    }

    /// `condition`이 true인 동안 대기, false가 되면 락을 잡은 상태로 반환
    pub fn wait_while<F>(&self, mut condition: F) -> SpinMutexGuard<'_, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        {
            let mut guard = self.state.lock();
            if !condition(&mut guard) {
                return guard;
            }
        }

        let mut sleep = self.sleep.lock();
        self.waiters.fetch_add(1, Ordering::SeqCst);

        loop {
            let mut guard = self.state.lock();
            if !condition(&mut guard) {
                self.waiters.fetch_sub(1, Ordering::SeqCst);
                drop(sleep);
                return guard;
            }
            drop(guard);

            self.cond.wait(&mut sleep);
        }
    }

    /// 대기자 하나를 깨움 (상태 락을 놓은 뒤 호출)
    pub fn notify_one(&self) {
        if self.waiters.load(Ordering::SeqCst) > 0 {
            let _sleep = self.sleep.lock();
            self.cond.notify_one();
        }
    }

    /// 모든 대기자를 깨움
    pub fn notify_all(&self) {
        if self.waiters.load(Ordering::SeqCst) > 0 {
            let _sleep = self.sleep.lock();
            self.cond.notify_all();
        }
    }
}

impl<T: Default> Default for SpinCond<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
