//! 동기화 유틸리티
//!
//! 스핀락, 스핀락 기반 조건 변수, 생산자/소비자 큐

pub mod cond;
pub mod double_queue;
pub mod spin_lock;
pub mod wait_queue;

pub use cond::SpinCond;
pub use double_queue::{Closed, DoubleQueue};
pub use spin_lock::{SpinLock, SpinLockGuard, SpinMutex, SpinMutexGuard};
pub use wait_queue::WaitQueue;
