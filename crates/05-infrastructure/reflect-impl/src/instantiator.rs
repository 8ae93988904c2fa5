//! 代理实例化器
//!
//! 需要跳过父类构造器时依次尝试原始分配层级；全部不可用时退回到执行构造器，
//! 并记录父类构造副作用将会发生的警告。

use infrastructure_common::{
    AllocationConfig, ClassDescriptor, Exception, InterceptionHandler, ObjectRef, ReflectError,
};
use reflect_abstractions::{ProxyClass, ProxyInstance, RawAllocator, TierError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 运行时能力，启动时确定一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeCapabilities {
    /// 不经构造器直接分配内存
    pub raw_allocation: bool,
    /// 通过句柄分配（仅限开放给句柄的类）
    pub handle_allocation: bool,
}

impl RuntimeCapabilities {
    pub fn detect(config: &AllocationConfig) -> Self {
        let capabilities = Self {
            raw_allocation: config.raw_allocation,
            handle_allocation: config.handle_allocation,
        };
        info!(
            "运行时分配能力: raw_allocation={}, handle_allocation={}",
            capabilities.raw_allocation, capabilities.handle_allocation
        );
        capabilities
    }

    pub const fn none() -> Self {
        Self {
            raw_allocation: false,
            handle_allocation: false,
        }
    }
}

/// 直接分配层级
#[derive(Debug, Clone)]
pub struct UnsafeAllocator {
    supported: bool,
}

impl UnsafeAllocator {
    pub fn new(supported: bool) -> Self {
        Self { supported }
    }
}

impl RawAllocator for UnsafeAllocator {
    fn name(&self) -> &'static str {
        "unsafe-allocation"
    }

    fn allocate(&self, class: &Arc<ClassDescriptor>) -> Result<ObjectRef, TierError> {
        if !self.supported {
            return Err(TierError::Unsupported {
                capability: "raw_allocation".to_string(),
            });
        }
        Ok(ObjectRef::allocate(class))
    }
}

/// 句柄分配层级，要求类型开放给句柄
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    supported: bool,
}

impl HandleAllocator {
    pub fn new(supported: bool) -> Self {
        Self { supported }
    }
}

impl RawAllocator for HandleAllocator {
    fn name(&self) -> &'static str {
        "handle-allocation"
    }

    fn allocate(&self, class: &Arc<ClassDescriptor>) -> Result<ObjectRef, TierError> {
        if !self.supported {
            return Err(TierError::Unsupported {
                capability: "handle_allocation".to_string(),
            });
        }
        if !class.open_to_handles() {
            return Err(TierError::Inaccessible {
                member: class.name().to_string(),
            });
        }
        Ok(ObjectRef::allocate(class))
    }
}

/// 代理实例化器
pub struct ProxyInstantiator {
    allocators: Vec<Box<dyn RawAllocator>>,
}

impl ProxyInstantiator {
    pub fn new(capabilities: RuntimeCapabilities) -> Self {
        Self::with_allocators(vec![
            Box::new(UnsafeAllocator::new(capabilities.raw_allocation)),
            Box::new(HandleAllocator::new(capabilities.handle_allocation)),
        ])
    }

    pub fn with_allocators(allocators: Vec<Box<dyn RawAllocator>>) -> Self {
        Self { allocators }
    }

    /// 创建代理实例并绑定处理器
    pub fn instantiate(
        &self,
        proxy_class: &Arc<ProxyClass>,
        call_super_constructor: bool,
        handler: Arc<dyn InterceptionHandler>,
    ) -> Result<ProxyInstance, ReflectError> {
        let object = if call_super_constructor {
            self.construct(proxy_class.class())?
        } else {
            self.allocate(proxy_class.class())?
        };
        self.bind_handler(&object, handler)?;

        ProxyInstance::bound(object, proxy_class.clone())
            .ok_or_else(|| Exception::illegal_state(format!("代理实例未绑定拦截处理器: {}", proxy_class.name())).into())
    }

    /// 绑定处理器，每个实例只能绑定一次
    pub fn bind_handler(&self, object: &ObjectRef, handler: Arc<dyn InterceptionHandler>) -> Result<(), ReflectError> {
        object.bind_handler(handler).map_err(|_| ReflectError::HandlerAlreadyBound {
            type_name: object.class().name().to_string(),
        })
    }

    fn construct(&self, class: &Arc<ClassDescriptor>) -> Result<ObjectRef, ReflectError> {
        let constructor = class
            .no_arg_constructor()
            .ok_or_else(|| ReflectError::member_not_found(class.name(), "<init>()"))?;
        Ok(ObjectRef::construct(class, constructor, &[])?)
    }

    fn allocate(&self, class: &Arc<ClassDescriptor>) -> Result<ObjectRef, ReflectError> {
        for allocator in &self.allocators {
            match allocator.allocate(class) {
                Ok(object) => {
                    debug!("{} 分配 {} 成功", allocator.name(), class.name());
                    return Ok(object);
                }
                Err(error) if error.is_unavailable() => {
                    debug!("{} 不可用: {}", allocator.name(), error);
                }
                Err(error) => {
                    warn!("{} 分配 {} 失败，尝试下一层级: {}", allocator.name(), class.name(), error);
                }
            }
        }

        warn!(
            "无法跳过构造器分配 {}，将执行父类构造器，构造副作用会发生",
            class.name()
        );
        self.construct(class)
    }
}

impl std::fmt::Debug for ProxyInstantiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.allocators.iter().map(|a| a.name()).collect();
        f.debug_struct("ProxyInstantiator").field("allocators", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure_common::{handler_fn, ClassBuilder, ConstructorDescriptor, FieldDescriptor, TypeRef, Value};
    use reflect_abstractions::ProxyConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tracked_proxy(counter: Arc<AtomicUsize>, open: bool) -> Arc<ProxyClass> {
        let base = ClassBuilder::class("app.Base")
            .field(FieldDescriptor::new("tag", TypeRef::String))
            .constructor(ConstructorDescriptor::new(Vec::new(), move |this, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                this.set("tag", "constructed")
            }))
            .build()
            .unwrap();
        let class = ClassBuilder::class("adsp.proxy.Base$Proxy$0")
            .extends(&base)
            .open_to_handles(open)
            .synthetic()
            .build()
            .unwrap();
        Arc::new(ProxyClass::new(class, ProxyConfig::new().extending(&base), Vec::new()))
    }

    fn echo() -> Arc<dyn InterceptionHandler> {
        handler_fn(|_, method, _| Ok(Value::from(method)))
    }

    #[test]
    fn constructs_when_super_constructor_requested() {
        let counter = Arc::new(AtomicUsize::new(0));
        let proxy = tracked_proxy(counter.clone(), true);
        let instantiator = ProxyInstantiator::new(RuntimeCapabilities {
            raw_allocation: true,
            handle_allocation: true,
        });

        let instance = instantiator.instantiate(&proxy, true, echo()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(instance.object().get("tag"), Some(Value::from("constructed")));
    }

    #[test]
    fn raw_allocation_skips_super_constructor() {
        let counter = Arc::new(AtomicUsize::new(0));
        let proxy = tracked_proxy(counter.clone(), false);
        let instantiator = ProxyInstantiator::new(RuntimeCapabilities {
            raw_allocation: true,
            handle_allocation: false,
        });

        let instance = instantiator.instantiate(&proxy, false, echo()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(instance.object().get("tag"), Some(Value::Null));
        assert!(instance.object().handler().is_some());
    }

    #[test]
    fn handle_allocation_requires_open_class() {
        let counter = Arc::new(AtomicUsize::new(0));
        let closed = tracked_proxy(counter.clone(), false);
        assert!(matches!(
            HandleAllocator::new(true).allocate(closed.class()),
            Err(TierError::Inaccessible { .. })
        ));

        let open = tracked_proxy(counter.clone(), true);
        let instantiator = ProxyInstantiator::new(RuntimeCapabilities {
            raw_allocation: false,
            handle_allocation: true,
        });
        instantiator.instantiate(&open, false, echo()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn falls_back_to_construction_without_allocation_tiers() {
        let counter = Arc::new(AtomicUsize::new(0));
        let proxy = tracked_proxy(counter.clone(), true);
        let instantiator = ProxyInstantiator::new(RuntimeCapabilities::none());

        let instance = instantiator.instantiate(&proxy, false, echo()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(instance.object().get("tag"), Some(Value::from("constructed")));
    }

    #[test]
    fn handler_binds_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let proxy = tracked_proxy(counter, true);
        let instantiator = ProxyInstantiator::new(RuntimeCapabilities::none());

        let instance = instantiator.instantiate(&proxy, true, echo()).unwrap();
        assert!(matches!(
            instantiator.bind_handler(instance.object(), echo()),
            Err(ReflectError::HandlerAlreadyBound { .. })
        ));
    }
}
