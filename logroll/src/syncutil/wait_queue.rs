//! 대기 큐
//!
//! 링 버퍼 하나를 스핀락 + 조건 변수로 보호합니다.
//! `pop()`은 원소가 생길 때까지 대기하며, 여러 소비자가 함께 사용할 수 있습니다.

use crate::memutil::RingBuffer;
use crate::syncutil::cond::SpinCond;
use crate::syncutil::double_queue::Closed;

struct State<T> {
    queue: RingBuffer<T>,
    closed: bool,
}

pub struct WaitQueue<T> {
    inner: SpinCond<State<T>>,
}

impl<T> WaitQueue<T> {
    pub fn new(init_capacity: usize) -> Self {
        Self {
            inner: SpinCond::new(State {
                queue: RingBuffer::new(init_capacity),
                closed: false,
            }),
        }
    }

    pub fn push(&self, v: T) -> Result<(), Closed<T>> {
        {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(Closed(v));
            }
            state.queue.push(v);
        }
        self.inner.notify_one();
        Ok(())
    }

    pub fn push_all(&self, vs: Vec<T>) -> Result<(), Closed<Vec<T>>> {
        let count = vs.len();
        {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(Closed(vs));
            }
            state.queue.push_all(vs);
        }
        if count > 1 {
            self.inner.notify_all();
        } else {
            self.inner.notify_one();
        }
        Ok(())
    }

    /// 머리 원소를 꺼냄, 비어 있으면 대기
    ///
    /// 큐가 닫히고 비었으면 `None`.
    pub fn pop(&self) -> Option<T> {
        let mut state = self
            .inner
            .wait_while(|state| state.queue.is_empty() && !state.closed);
        state.queue.pop()
    }

    /// 최대 `max`개를 한 번에 꺼냄, 비어 있으면 대기
    pub fn pop_some(&self, max: usize) -> Vec<T> {
        let mut state = self
            .inner
            .wait_while(|state| state.queue.is_empty() && !state.closed);
        state.queue.pop_some(max)
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().queue.pop()
    }

    /// 큐를 닫고 대기 중인 소비자를 모두 깨움
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.inner.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// 남은 원소를 모두 버림
    pub fn clear(&self) {
        self.inner.lock().queue.clear();
    }
}
