//! 拦截处理器接口

use crate::errors::Exception;
use crate::value::{ObjectRef, Value};
use std::sync::Arc;

/// 拦截处理器
///
/// 代理类的每个生成方法都会调用它。返回的错误原样传递给代理的调用方。
pub trait InterceptionHandler: Send + Sync {
    /// 处理一次方法调用
    fn invoke(&self, proxy: &ObjectRef, method: &str, args: Vec<Value>) -> Result<Value, Exception>;
}

impl<F> InterceptionHandler for F
where
    F: Fn(&ObjectRef, &str, Vec<Value>) -> Result<Value, Exception> + Send + Sync,
{
    fn invoke(&self, proxy: &ObjectRef, method: &str, args: Vec<Value>) -> Result<Value, Exception> {
        self(proxy, method, args)
    }
}

/// 以闭包创建拦截处理器
pub fn handler_fn<F>(handler: F) -> Arc<dyn InterceptionHandler>
where
    F: Fn(&ObjectRef, &str, Vec<Value>) -> Result<Value, Exception> + Send + Sync + 'static,
{
    Arc::new(handler)
}
