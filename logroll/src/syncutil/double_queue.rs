//! 이중 버퍼 큐 (다중 생산자, 단일 소비자)
//!
//! 생산자는 스핀락 아래에서 쓰기 버퍼에 추가만 합니다.
//! 소비자는 읽기 버퍼가 비었을 때만 락을 잡고 두 버퍼를 교환한 뒤,
//! 락 없이 읽기 버퍼에서 꺼냅니다. 한 번 교환할 때마다 쓰기 버퍼 전체를 가져갑니다.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::memutil::RingBuffer;
use crate::syncutil::cond::SpinCond;

/// 닫힌 큐에 추가를 시도했을 때 값을 돌려줌
#[derive(PartialEq, Eq)]
pub struct Closed<T>(pub T);

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closed(..)")
    }
}

impl<T> fmt::Display for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is closed")
    }
}

impl<T> std::error::Error for Closed<T> {}

impl<T> Closed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

struct WriteSide<T> {
    queue: RingBuffer<T>,
    closed: bool,
}

/// 이중 버퍼 큐
pub struct DoubleQueue<T> {
    write: SpinCond<WriteSide<T>>,
    /// 소비자 전용, 경합 없음
    read: Mutex<RingBuffer<T>>,
    /// 읽기 버퍼 원소 수 (len()이 소비자를 기다리지 않도록 별도 보관)
    read_len: AtomicUsize,
}

impl<T> DoubleQueue<T> {
    pub fn new(init_capacity: usize) -> Self {
        Self {
            write: SpinCond::new(WriteSide {
                queue: RingBuffer::new(init_capacity),
                closed: false,
            }),
            read: Mutex::new(RingBuffer::new(init_capacity)),
            read_len: AtomicUsize::new(0),
        }
    }

    /// 꼬리에 추가, 큐가 닫혔으면 값을 돌려줌
    pub fn push(&self, v: T) -> Result<(), Closed<T>> {
        {
            let mut side = self.write.lock();
            if side.closed {
                return Err(Closed(v));
            }
            side.queue.push(v);
        }
        self.write.notify_one();
        Ok(())
    }

    /// 여러 원소를 한 번에 추가
    pub fn push_all(&self, vs: Vec<T>) -> Result<(), Closed<Vec<T>>> {
        {
            let mut side = self.write.lock();
            if side.closed {
                return Err(Closed(vs));
            }
            side.queue.push_all(vs);
        }
        self.write.notify_one();
        Ok(())
    }

    /// 머리 원소를 꺼냄, 비어 있으면 대기 (단일 소비자 전용)
    ///
    /// 큐가 닫히고 모두 비워지면 `None`을 반환합니다.
    pub fn pop(&self) -> Option<T> {
        let mut read = self.read.lock();
        if read.is_empty() {
            let mut side = self
                .write
                .wait_while(|side| side.queue.is_empty() && !side.closed);
            std::mem::swap(&mut *read, &mut side.queue);
        }
        let v = read.pop();
        self.read_len.store(read.len(), Ordering::Relaxed);
        v
    }

    /// 대기하지 않고 꺼냄
    pub fn try_pop(&self) -> Option<T> {
        let mut read = self.read.lock();
        if read.is_empty() {
            let mut side = self.write.lock();
            if side.queue.is_empty() {
                return None;
            }
            std::mem::swap(&mut *read, &mut side.queue);
        }
        let v = read.pop();
        self.read_len.store(read.len(), Ordering::Relaxed);
        v
    }

    /// 큐를 닫음, 이후 추가는 실패하고 남은 원소는 계속 꺼낼 수 있음
    pub fn close(&self) {
        self.write.lock().closed = true;
        self.write.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.write.lock().closed
    }

    /// 두 버퍼에 남은 원소 수
    pub fn len(&self) -> usize {
        let pending = self.write.lock().queue.len();
        self.read_len.load(Ordering::Relaxed) + pending
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_single_thread() {
        let q = DoubleQueue::new(2);
        for i in 0..10 {
            q.push(i).unwrap();
        }
        assert_eq!(q.len(), 10);
        for i in 0..10 {
            assert_eq!(q.pop(), Some(i));
        }
        assert!(q.is_empty());
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let q = Arc::new(DoubleQueue::new(4));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop())
        };

        thread::sleep(Duration::from_millis(20));
        q.push("late").unwrap();
        assert_eq!(consumer.join().unwrap(), Some("late"));
    }

    #[test]
    fn test_close_rejects_push_and_drains() {
        let q = DoubleQueue::new(4);
        q.push(1).unwrap();
        q.push(2).unwrap();
        q.close();

        assert_eq!(q.push(3), Err(Closed(3)));
        assert!(q.is_closed());
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let q: Arc<DoubleQueue<u32>> = Arc::new(DoubleQueue::new(4));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop())
        };

        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_multi_producer_keeps_per_producer_order() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 5_000;

        let q = Arc::new(DoubleQueue::new(16));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        q.push((p, seq)).unwrap();
                    }
                })
            })
            .collect();

        let mut next: HashMap<usize, usize> = HashMap::new();
        for _ in 0..PRODUCERS * PER_PRODUCER {
            let (p, seq) = q.pop().unwrap();
            let expected = next.entry(p).or_insert(0);
            assert_eq!(seq, *expected, "producer {p} out of order");
            *expected += 1;
        }

        for h in producers {
            h.join().unwrap();
        }
        assert!(q.is_empty());
        assert!(next.values().all(|&n| n == PER_PRODUCER));
    }

    #[test]
    fn test_push_all() {
        let q = DoubleQueue::new(1);
        q.push_all(vec![1, 2, 3]).unwrap();
        assert_eq!(q.pop(), Some(1));
        q.close();
        assert!(q.push_all(vec![4]).is_err());
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }
}
