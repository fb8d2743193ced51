//! 참조 카운트 객체
//!
//! 여러 스레드가 공유하는 객체에 명시적인 참조 카운트를 붙이고,
//! 카운트가 0이 되는 순간 해제 콜백을 정확히 한 번 호출합니다.
//! 풀에서 꺼낸 객체를 여러 작성기가 공유한 뒤 풀로 되돌리는 용도입니다.

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// 원자적 참조 카운터
#[derive(Debug, Default)]
pub struct RefCounter {
    count: AtomicI32,
}

impl RefCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicI32::new(0),
        }
    }

    /// 참조 카운트 증가, 증가 후 값 반환
    #[inline]
    pub fn inc_ref(&self) -> i32 {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// 참조 카운트 감소, 감소 후 값 반환
    #[inline]
    pub fn dec_ref(&self) -> i32 {
        self.count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// 현재 참조 카운트 (동기화 판단에 사용 금지)
    #[inline]
    pub fn ref_count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }
}

/// 카운트가 0이 되었을 때 호출되는 해제 콜백
pub type RefDestroyer<T> = Arc<dyn Fn(Arc<RefObject<T>>) + Send + Sync>;

/// 참조 카운트가 붙은 객체
///
/// 생성 직후 카운트는 0입니다. 사용 전에 반드시 [`RefObject::inc_ref`]를 호출해야 합니다.
/// [`RefObject::dec_ref`]가 0을 반환한 뒤에는 객체를 만지면 안 됩니다 (풀로 반환됨).
pub struct RefObject<T> {
    object: T,
    counter: RefCounter,
    destroyer: Option<RefDestroyer<T>>,
}

impl<T> RefObject<T> {
    /// 새 참조 카운트 객체 생성
    pub fn new(object: T, destroyer: Option<RefDestroyer<T>>) -> Arc<Self> {
        Arc::new(Self {
            object,
            counter: RefCounter::new(),
            destroyer,
        })
    }

    #[inline]
    pub fn inc_ref(&self) -> i32 {
        self.counter.inc_ref()
    }

    /// 참조 카운트 감소, 0이 되면 해제 콜백 호출
    pub fn dec_ref(self: &Arc<Self>) -> i32 {
        let v = self.counter.dec_ref();
        debug_assert!(v >= 0, "참조 카운트가 음수가 됨: {v}");

        if v == 0 {
            if let Some(destroyer) = &self.destroyer {
                destroyer(Arc::clone(self));
            }
        }
        v
    }

    #[inline]
    pub fn ref_count(&self) -> i32 {
        self.counter.ref_count()
    }

    /// 내부 객체 참조
    #[inline]
    pub fn object(&self) -> &T {
        &self.object
    }
}

impl<T: fmt::Debug> fmt::Debug for RefObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefObject")
            .field("object", &self.object)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
