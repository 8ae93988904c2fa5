//! 调用器缓存
//!
//! 每个键对应一个单次初始化单元：并发首次访问时只有一个线程执行编译，
//! 其余线程等待同一结果。编译失败不会被记住，下次访问重新尝试。

use dashmap::DashMap;
use infrastructure_common::ReflectError;
use once_cell::sync::OnceCell;
use reflect_abstractions::{CompiledInvoker, MemberKey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 已编译的条目数
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// 实际执行的编译次数（含失败）
    pub compilations: u64,
}

/// 调用器缓存
#[derive(Debug, Default)]
pub struct InvokerCache {
    entries: DashMap<MemberKey, Arc<OnceCell<CompiledInvoker>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
}

impl InvokerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取缓存的调用器，不存在时执行编译
    pub fn get_or_compile<F>(&self, key: &MemberKey, compile: F) -> Result<CompiledInvoker, ReflectError>
    where
        F: FnOnce() -> Result<CompiledInvoker, ReflectError>,
    {
        if let Some(invoker) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(invoker);
        }

        // 编译在分片锁之外进行，只持有单元的引用
        let cell = self.entries.entry(key.clone()).or_default().clone();
        let mut compiled_here = false;
        let result = cell
            .get_or_try_init(|| {
                compiled_here = true;
                self.compilations.fetch_add(1, Ordering::Relaxed);
                debug!("编译调用器: {}", key);
                compile()
            })
            .cloned();

        if compiled_here {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        if result.is_err() {
            self.entries.remove_if(key, |_, cell| cell.get().is_none());
        }
        result
    }

    /// 仅查询，不触发编译
    pub fn get(&self, key: &MemberKey) -> Option<CompiledInvoker> {
        self.entries.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
        }
    }

    /// 清空全部条目与统计
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.compilations.store(0, Ordering::Relaxed);
        debug!("调用器缓存已清空，移除 {} 个条目", count);
    }
}
