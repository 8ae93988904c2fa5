//! # Reflection Implementation
//!
//! 反射消除层的具体实现：把按名称的反射访问编译为缓存的调用器，并为拦截生成代理类。
//!
//! ## 组成
//!
//! - [`DefaultMemberResolver`] - 构造器重载与字段解析
//! - [`InvokerCompiler`] - 原生 → 类型句柄 → 反射的层级回退编译
//! - [`InvokerCache`] - 每个成员至多编译一次的线程安全缓存
//! - [`ProxyClassCompiler`] - 生成转发到拦截处理器的代理类
//! - [`ProxyInstantiator`] - 可跳过父类构造器的代理实例化
//! - [`ReflectionRuntime`] - 依赖注入容器使用的统一入口
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use reflect_impl::{LoggingConfig, ReflectionRuntime};
//!
//! let runtime = ReflectionRuntime::builder()
//!     .with_logging(LoggingConfig::development())
//!     .build()?;
//! let person = runtime.class("app.Person")?;
//! let invoker = runtime.get_or_compile_constructor_invoker(&person, None)?;
//! let instance = invoker.construct(&[Value::from("Ann"), Value::Int(30)])?;
//! ```

pub mod cache;
pub mod compiler;
pub mod dump;
pub mod instantiator;
pub mod logging;
mod marshal;
pub mod proxy_compiler;
pub mod resolver;
pub mod runtime;
pub mod tiers;

pub use cache::{CacheStats, InvokerCache};
pub use compiler::InvokerCompiler;
pub use dump::ClassDumper;
pub use instantiator::{HandleAllocator, ProxyInstantiator, RuntimeCapabilities, UnsafeAllocator};
pub use logging::{init_logging, LoggingConfig};
pub use proxy_compiler::ProxyClassCompiler;
pub use resolver::DefaultMemberResolver;
pub use runtime::{ReflectionRuntime, ReflectionRuntimeBuilder};
pub use tiers::{NativeStrategy, ReflectiveStrategy, TypedHandleStrategy};
