//! # Reflection Abstractions
//!
//! 反射消除层的抽象接口，定义调用器、成员解析和代理生成的核心契约。
//!
//! ## 核心接口
//!
//! - [`ConstructorInvoker`] / [`FieldInvoker`] - 编译后的调用器
//! - [`InvokerStrategy`] - 单个实现层级的调用器工厂
//! - [`MemberResolver`] - 成员解析器接口
//! - [`RawAllocator`] - 跳过构造器的分配层级
//! - [`ProxyConfig`] / [`ProxyClass`] / [`ProxyInstance`] - 代理描述

pub mod invoker;
pub mod proxy;
pub mod resolver;
pub mod strategy;

pub use invoker::*;
pub use proxy::*;
pub use resolver::*;
pub use strategy::*;

pub use infrastructure_common::InterceptionHandler;
