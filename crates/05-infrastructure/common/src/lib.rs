//! # Infrastructure Common
//!
//! 这个 crate 提供了调用器与代理生成层共享的运行时类型模型。
//!
//! ## 核心类型
//!
//! - [`ClassDescriptor`] / [`ClassBuilder`] - 类元数据及其构建器
//! - [`TypeRef`] / [`Primitive`] - 类型引用与装箱表
//! - [`Value`] / [`ObjectRef`] - 运行时值与对象实例
//! - [`TypeRegistry`] - 按名称定义类的注册表
//! - [`InterceptionHandler`] - 代理方法调用的拦截接口
//! - [`RuntimeConfig`] - 运行时配置
//!
//! ## 设计原则
//!
//! - 元数据一经构建即不可变，可在线程间自由共享
//! - 应用异常以 [`Exception`] 值原样透传

pub mod configuration;
pub mod errors;
pub mod interception;
pub mod metadata;
pub mod registry;
pub mod value;

pub use configuration::*;
pub use errors::*;
pub use interception::*;
pub use metadata::*;
pub use registry::*;
pub use value::*;
