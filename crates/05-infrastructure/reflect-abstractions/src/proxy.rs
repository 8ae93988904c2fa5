//! 代理描述

use infrastructure_common::{ClassDescriptor, Exception, ObjectRef, Value};
use std::fmt;
use std::sync::Arc;

/// 代理配置
#[derive(Clone)]
pub struct ProxyConfig {
    /// 目标接口，可为空
    pub interfaces: Vec<Arc<ClassDescriptor>>,
    /// 继承的父类，默认为根类型
    pub superclass: Option<Arc<ClassDescriptor>>,
    /// 显式类名，为空时自动生成
    pub name: Option<String>,
    /// 构造时是否执行父类构造器
    pub call_super_constructor: bool,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self {
            interfaces: Vec::new(),
            superclass: None,
            name: None,
            call_super_constructor: true,
        }
    }

    pub fn implementing(mut self, interface: &Arc<ClassDescriptor>) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    pub fn extending(mut self, superclass: &Arc<ClassDescriptor>) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn call_super_constructor(mut self, call: bool) -> Self {
        self.call_super_constructor = call;
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field(
                "interfaces",
                &self.interfaces.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("superclass", &self.superclass.as_ref().map(|c| c.name()))
            .field("name", &self.name)
            .field("call_super_constructor", &self.call_super_constructor)
            .finish()
    }
}

/// 已加载的代理类
#[derive(Debug)]
pub struct ProxyClass {
    class: Arc<ClassDescriptor>,
    config: ProxyConfig,
    intercepted: Vec<String>,
}

impl ProxyClass {
    pub fn new(class: Arc<ClassDescriptor>, config: ProxyConfig, intercepted: Vec<String>) -> Self {
        Self {
            class,
            config,
            intercepted,
        }
    }

    /// 完全限定类名
    pub fn name(&self) -> &str {
        self.class.name()
    }

    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.class
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// 被拦截的方法签名
    pub fn intercepted_methods(&self) -> &[String] {
        &self.intercepted
    }

    pub fn call_super_constructor(&self) -> bool {
        self.config.call_super_constructor
    }
}

/// 已绑定处理器的代理实例
#[derive(Debug, Clone)]
pub struct ProxyInstance {
    object: ObjectRef,
    proxy_class: Arc<ProxyClass>,
}

impl ProxyInstance {
    /// 包装代理对象；处理器尚未绑定时返回 `None`
    pub fn bound(object: ObjectRef, proxy_class: Arc<ProxyClass>) -> Option<Self> {
        object.handler()?;
        Some(Self {
            object,
            proxy_class,
        })
    }

    /// 调用代理方法
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, Exception> {
        self.object.invoke(method, args)
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn into_object(self) -> ObjectRef {
        self.object
    }

    pub fn proxy_class(&self) -> &Arc<ProxyClass> {
        &self.proxy_class
    }
}
