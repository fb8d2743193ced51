//! 메모리 유틸리티
//!
//! 링 버퍼, 참조 카운트 객체, 버퍼 풀

pub mod pool;
pub mod ref_object;
pub mod ring_buffer;

pub use pool::{BufferHandle, BufferPool, BufferPoolConfig, PoolStatsSnapshot, SharedBuffer};
pub use ref_object::{RefCounter, RefDestroyer, RefObject};
pub use ring_buffer::RingBuffer;
