//! 자동 확장 링 버퍼
//!
//! 큐의 저장소로 사용됩니다. 용량은 늘어나기만 하고 줄어들지 않습니다.

/// 이 크기 미만에서는 용량을 2배로 늘림
const MAX_DOUBLE_SIZE: usize = 2 * 1024;
/// 이 크기 미만에서는 용량을 1.5배로 늘림 (이상은 1.25배)
const MAX_ADD_HALF_SIZE: usize = 15 * 1024;

/// 링 버퍼
#[derive(Debug)]
pub struct RingBuffer<T> {
    /// 실제 슬롯
    buff: Vec<Option<T>>,
    /// 현재 원소 개수
    size: usize,
    /// 읽기 위치
    first: usize,
    /// 쓰기 위치
    last: usize,
}

impl<T> RingBuffer<T> {
    /// 새 링 버퍼 생성 (용량 0은 1로 보정)
    pub fn new(init_capacity: usize) -> Self {
        let capacity = init_capacity.max(1);
        let mut buff = Vec::with_capacity(capacity);
        buff.resize_with(capacity, || None);

        Self {
            buff,
            size: 0,
            first: 0,
            last: 0,
        }
    }

    /// 꼬리에 원소 추가
    pub fn push(&mut self, v: T) {
        if self.size + 1 > self.capacity() {
            self.grow(self.capacity() + 1);
        }

        self.buff[self.last] = Some(v);
        self.last = (self.last + 1) % self.capacity();
        self.size += 1;
    }

    /// 여러 원소를 순서대로 추가
    pub fn push_all<I: IntoIterator<Item = T>>(&mut self, vs: I) {
        let iter = vs.into_iter();
        let (lower, _) = iter.size_hint();
        if self.size + lower > self.capacity() {
            self.grow(self.size + lower);
        }

        for v in iter {
            self.push(v);
        }
    }

    /// 머리에서 원소 꺼내기
    pub fn pop(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }

        let v = self.buff[self.first].take();
        self.first = (self.first + 1) % self.capacity();
        self.size -= 1;
        v
    }

    /// 최대 `max`개의 원소를 꺼냄
    pub fn pop_some(&mut self, max: usize) -> Vec<T> {
        let count = max.min(self.size);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(v) = self.pop() {
                out.push(v);
            }
        }
        out
    }

    /// 머리 원소 참조
    pub fn front(&self) -> Option<&T> {
        if self.size == 0 {
            return None;
        }
        self.buff[self.first].as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buff.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 모든 원소 제거 (용량은 유지)
    pub fn clear(&mut self) {
        for slot in self.buff.iter_mut() {
            *slot = None;
        }
        self.size = 0;
        self.first = 0;
        self.last = 0;
    }

    /// `need` 이상을 담을 수 있는 새 용량 계산
    fn calculate_new_capacity(old: usize, need: usize) -> usize {
        let mut cap = old.max(1);
        while cap < need {
            cap = if cap < MAX_DOUBLE_SIZE {
                cap * 2
            } else if cap < MAX_ADD_HALF_SIZE {
                cap + cap / 2
            } else {
                cap + cap / 4
            };
        }
        cap
    }

    /// 용량 확장, 원소는 0번 슬롯부터 재배치
    fn grow(&mut self, need: usize) {
        let cap = Self::calculate_new_capacity(self.capacity(), need);
        let mut new_buff: Vec<Option<T>> = Vec::with_capacity(cap);

        let old_cap = self.capacity();
        for i in 0..self.size {
            let idx = (self.first + i) % old_cap;
            new_buff.push(self.buff[idx].take());
        }
        new_buff.resize_with(cap, || None);

        self.buff = new_buff;
        self.first = 0;
        self.last = self.size % cap;
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(16)
    }
}
