//! 反射消除运行时
//!
//! 依赖注入容器使用的统一入口：构造器与字段调用器的获取或编译、代理类的生成与实例化。

use crate::cache::{CacheStats, InvokerCache};
use crate::compiler::InvokerCompiler;
use crate::instantiator::{ProxyInstantiator, RuntimeCapabilities};
use crate::logging::{init_logging, LoggingConfig};
use crate::proxy_compiler::ProxyClassCompiler;
use crate::resolver::DefaultMemberResolver;
use infrastructure_common::{
    ClassDescriptor, InterceptionHandler, ObjectRef, ReflectError, RuntimeConfig, TypeRef, TypeRegistry, Value,
};
use reflect_abstractions::{
    CompiledInvoker, ConstructorInvoker, FieldInvoker, InvokerStrategy, MemberKey, MemberResolver, ProxyClass,
    ProxyConfig, ProxyInstance, RawAllocator,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 反射消除运行时
pub struct ReflectionRuntime {
    config: RuntimeConfig,
    registry: Arc<TypeRegistry>,
    resolver: Arc<dyn MemberResolver>,
    compiler: InvokerCompiler,
    cache: Arc<InvokerCache>,
    proxies: ProxyClassCompiler,
    instantiator: ProxyInstantiator,
    capabilities: RuntimeCapabilities,
}

impl ReflectionRuntime {
    /// 使用给定配置创建运行时
    pub fn new(config: RuntimeConfig) -> Self {
        Self::from_parts(config, None, None, None, None, None)
    }

    pub fn builder() -> ReflectionRuntimeBuilder {
        ReflectionRuntimeBuilder::new()
    }

    fn from_parts(
        config: RuntimeConfig,
        registry: Option<Arc<TypeRegistry>>,
        cache: Option<Arc<InvokerCache>>,
        resolver: Option<Arc<dyn MemberResolver>>,
        strategies: Option<Vec<Box<dyn InvokerStrategy>>>,
        allocators: Option<Vec<Box<dyn RawAllocator>>>,
    ) -> Self {
        let registry = registry.unwrap_or_default();
        let resolver: Arc<dyn MemberResolver> = match resolver {
            Some(resolver) => resolver,
            None => Arc::new(DefaultMemberResolver::new(registry.clone())),
        };
        let compiler = match strategies {
            Some(strategies) => InvokerCompiler::new(strategies),
            None => InvokerCompiler::from_config(&config.invoker),
        };
        let capabilities = RuntimeCapabilities::detect(&config.allocation);
        let instantiator = match allocators {
            Some(allocators) => ProxyInstantiator::with_allocators(allocators),
            None => ProxyInstantiator::new(capabilities),
        };
        let proxies = ProxyClassCompiler::new(registry.clone(), &config.proxy);

        debug!("反射运行时组件: {:?}, {:?}", compiler, instantiator);
        Self {
            config,
            registry,
            resolver,
            compiler,
            cache: cache.unwrap_or_default(),
            proxies,
            instantiator,
            capabilities,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn capabilities(&self) -> RuntimeCapabilities {
        self.capabilities
    }

    /// 定义类型
    pub fn define(&self, class: Arc<ClassDescriptor>) -> Result<Arc<ClassDescriptor>, ReflectError> {
        self.registry.define(class)
    }

    /// 按名称查找已定义的类型
    pub fn class(&self, name: &str) -> Result<Arc<ClassDescriptor>, ReflectError> {
        self.registry.require(name)
    }

    /// 获取或编译构造器调用器；`params` 为空时选择默认构造器
    pub fn get_or_compile_constructor_invoker(
        &self,
        owner: &Arc<ClassDescriptor>,
        params: Option<&[TypeRef]>,
    ) -> Result<Arc<dyn ConstructorInvoker>, ReflectError> {
        let key = MemberKey::constructor(owner, params);
        let compiled = self.cache.get_or_compile(&key, || {
            let member = self.resolver.resolve_constructor(owner, params)?;
            self.compiler.compile_constructor(&member).map(CompiledInvoker::Constructor)
        })?;

        compiled
            .as_constructor()
            .cloned()
            .ok_or_else(|| ReflectError::compilation_failure(key.to_string(), "缓存项不是构造器调用器"))
    }

    /// 获取或编译字段调用器
    pub fn get_or_compile_field_invoker(
        &self,
        owner: &Arc<ClassDescriptor>,
        name: &str,
    ) -> Result<Arc<dyn FieldInvoker>, ReflectError> {
        let key = MemberKey::field(owner, name);
        let compiled = self.cache.get_or_compile(&key, || {
            let member = self.resolver.resolve_field(owner, name)?;
            self.compiler.compile_field(&member).map(CompiledInvoker::Field)
        })?;

        compiled
            .as_field()
            .cloned()
            .ok_or_else(|| ReflectError::compilation_failure(key.to_string(), "缓存项不是字段调用器"))
    }

    /// 通过构造器调用器创建实例
    pub fn construct(
        &self,
        owner: &Arc<ClassDescriptor>,
        params: Option<&[TypeRef]>,
        args: &[Value],
    ) -> Result<ObjectRef, ReflectError> {
        self.get_or_compile_constructor_invoker(owner, params)?.construct(args)
    }

    /// 编译代理类
    pub fn compile_proxy(&self, config: &ProxyConfig) -> Result<Arc<ProxyClass>, ReflectError> {
        self.proxies.compile(config)
    }

    /// 按代理类配置实例化并绑定处理器
    pub fn instantiate_proxy(
        &self,
        proxy_class: &Arc<ProxyClass>,
        handler: Arc<dyn InterceptionHandler>,
    ) -> Result<ProxyInstance, ReflectError> {
        self.instantiator
            .instantiate(proxy_class, proxy_class.call_super_constructor(), handler)
    }

    /// 实例化代理，显式指定是否执行父类构造器
    pub fn instantiate_proxy_with(
        &self,
        proxy_class: &Arc<ProxyClass>,
        call_super_constructor: bool,
        handler: Arc<dyn InterceptionHandler>,
    ) -> Result<ProxyInstance, ReflectError> {
        self.instantiator.instantiate(proxy_class, call_super_constructor, handler)
    }

    /// 编译并实例化代理
    pub fn create_proxy(
        &self,
        config: &ProxyConfig,
        handler: Arc<dyn InterceptionHandler>,
    ) -> Result<ProxyInstance, ReflectError> {
        let proxy_class = self.compile_proxy(config)?;
        self.instantiate_proxy(&proxy_class, handler)
    }

    /// 为已分配的代理对象绑定处理器
    pub fn bind_handler(&self, object: &ObjectRef, handler: Arc<dyn InterceptionHandler>) -> Result<(), ReflectError> {
        self.instantiator.bind_handler(object, handler)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// 清空调用器缓存；已生成的代理类保留
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn proxy_class_count(&self) -> usize {
        self.proxies.len()
    }
}

impl Default for ReflectionRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for ReflectionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionRuntime")
            .field("config", &self.config)
            .field("classes", &self.registry.len())
            .field("cache", &self.cache.stats())
            .field("proxies", &self.proxies.len())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// 运行时构建器
#[derive(Default)]
pub struct ReflectionRuntimeBuilder {
    config: RuntimeConfig,
    registry: Option<Arc<TypeRegistry>>,
    cache: Option<Arc<InvokerCache>>,
    resolver: Option<Arc<dyn MemberResolver>>,
    strategies: Option<Vec<Box<dyn InvokerStrategy>>>,
    allocators: Option<Vec<Box<dyn RawAllocator>>>,
    logging: Option<LoggingConfig>,
}

impl ReflectionRuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// 从配置文件与 `REFLECT__*` 环境变量加载配置
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ReflectError> {
        self.config = RuntimeConfig::load(Some(path.as_ref())).map_err(|e| ReflectError::BootstrapFailed {
            message: format!("配置加载失败: {}", e),
        })?;
        Ok(self)
    }

    /// 共享已有的类型注册表
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 共享已有的调用器缓存
    pub fn with_cache(mut self, cache: Arc<InvokerCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn MemberResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 替换调用器层级策略链
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn InvokerStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// 替换原始分配层级
    pub fn with_allocators(mut self, allocators: Vec<Box<dyn RawAllocator>>) -> Self {
        self.allocators = Some(allocators);
        self
    }

    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    pub fn build(self) -> Result<ReflectionRuntime, ReflectError> {
        if let Some(logging) = &self.logging {
            init_logging(logging)?;
        }

        self.config.validate().map_err(|e| ReflectError::BootstrapFailed {
            message: format!("配置校验失败: {}", e),
        })?;

        let runtime = ReflectionRuntime::from_parts(
            self.config,
            self.registry,
            self.cache,
            self.resolver,
            self.strategies,
            self.allocators,
        );
        info!("反射运行时构建完成");
        Ok(runtime)
    }
}
