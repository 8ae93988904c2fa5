//! 代理类编译器
//!
//! 为给定的父类与接口组合生成代理类：每个可重写的方法都转发到实例上绑定的拦截处理器。
//! 生成的类定义到类型注册表中，同名请求复用已生成的类。

use crate::dump::ClassDumper;
use crate::marshal::{box_arguments, convert_return};
use dashmap::DashMap;
use infrastructure_common::{
    format_params, ClassBuilder, ClassDescriptor, ConstructorDescriptor, Exception, MethodDescriptor,
    ProxyCompilerConfig, ReflectError, TypeRef, TypeRegistry, Visibility,
};
use once_cell::sync::OnceCell;
use reflect_abstractions::{ProxyClass, ProxyConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 未显式命名的请求按形状去重
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProxyShape {
    superclass: Arc<str>,
    interfaces: Vec<Arc<str>>,
    call_super_constructor: bool,
}

/// 代理类编译器
#[derive(Debug)]
pub struct ProxyClassCompiler {
    registry: Arc<TypeRegistry>,
    namespace: String,
    sequence: AtomicU64,
    classes: DashMap<Arc<str>, Arc<OnceCell<Arc<ProxyClass>>>>,
    shapes: DashMap<ProxyShape, Arc<str>>,
    dumper: Option<ClassDumper>,
}

impl ProxyClassCompiler {
    pub fn new(registry: Arc<TypeRegistry>, config: &ProxyCompilerConfig) -> Self {
        Self {
            registry,
            namespace: config.namespace.clone(),
            sequence: AtomicU64::new(0),
            classes: DashMap::new(),
            shapes: DashMap::new(),
            dumper: config.dump_dir.as_ref().map(|dir| ClassDumper::new(dir.clone())),
        }
    }

    /// 编译代理类；同名类已生成时直接返回
    pub fn compile(&self, config: &ProxyConfig) -> Result<Arc<ProxyClass>, ReflectError> {
        let superclass = config.superclass.clone().unwrap_or_else(ClassDescriptor::object_root);
        if superclass.is_interface() {
            return Err(ReflectError::InvalidSuperclass {
                type_name: superclass.name().to_string(),
            });
        }
        if let Some(interface) = config.interfaces.iter().find(|i| !i.is_interface()) {
            return Err(ReflectError::compilation_failure(
                interface.name(),
                "代理目标不是接口",
            ));
        }

        let (name, shape) = self.class_name(config, &superclass);
        let cell = self.classes.entry(name.clone()).or_default().clone();
        let result = cell
            .get_or_try_init(|| self.generate(&name, &superclass, config))
            .cloned();

        if result.is_err() {
            self.classes.remove_if(&name, |_, cell| cell.get().is_none());
            if let Some(shape) = shape {
                self.shapes.remove_if(&shape, |_, assigned| *assigned == name);
            }
        }
        result
    }

    /// 已生成的代理类数量
    pub fn len(&self) -> usize {
        self.classes.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProxyClass>> {
        self.classes.get(name).and_then(|cell| cell.get().cloned())
    }

    /// 最终类名；未显式命名时同时返回用于去重的形状
    fn class_name(&self, config: &ProxyConfig, superclass: &Arc<ClassDescriptor>) -> (Arc<str>, Option<ProxyShape>) {
        if let Some(name) = &config.name {
            return (Arc::from(name.as_str()), None);
        }

        let shape = ProxyShape {
            superclass: superclass.name_arc(),
            interfaces: config.interfaces.iter().map(|i| i.name_arc()).collect(),
            call_super_constructor: config.call_super_constructor,
        };
        let name = self
            .shapes
            .entry(shape.clone())
            .or_insert_with(|| self.next_name(config, superclass))
            .clone();
        (name, Some(shape))
    }

    fn next_name(&self, config: &ProxyConfig, superclass: &ClassDescriptor) -> Arc<str> {
        let base = match config.interfaces.first() {
            Some(interface) if superclass.is_root() => interface.simple_name(),
            _ => superclass.simple_name(),
        };
        loop {
            let id = self.sequence.fetch_add(1, Ordering::Relaxed);
            let name = format!("{}.{}$Proxy${}", self.namespace, base, id);
            if !self.classes.contains_key(name.as_str()) && !self.registry.contains(&name) {
                return Arc::from(name);
            }
            debug!("代理类名已被占用，跳过: {}", name);
        }
    }

    fn generate(
        &self,
        name: &Arc<str>,
        superclass: &Arc<ClassDescriptor>,
        config: &ProxyConfig,
    ) -> Result<Arc<ProxyClass>, ReflectError> {
        debug!("生成代理类: {} (父类 {})", name, superclass.name());

        let accessible = superclass
            .no_arg_constructor()
            .is_some_and(|constructor| constructor.visibility != Visibility::Private);
        if !accessible {
            return Err(ReflectError::compilation_failure(
                &**name,
                format!("父类 {} 缺少可访问的无参构造器", superclass.name()),
            ));
        }

        let methods = select_methods(superclass, &config.interfaces);
        let mut builder = ClassBuilder::class(name.clone())
            .extends(superclass)
            .constructor(ConstructorDescriptor::no_arg())
            .open_to_handles(true)
            .synthetic();
        for interface in &config.interfaces {
            builder = builder.implements(interface);
        }

        let mut intercepted = Vec::with_capacity(methods.len());
        for method in &methods {
            check_signature(name, method)?;
            intercepted.push(format!("{}{}", method.name, format_params(&method.params)));
            builder = builder.method(intercepting_method(method));
        }

        let class = builder.build().map_err(|error| match error {
            ReflectError::InvalidMetadata { message, .. } => ReflectError::compilation_failure(&**name, message),
            other => other,
        })?;
        let class = self.registry.define(class)?;

        let proxy = Arc::new(ProxyClass::new(class, config.clone(), intercepted));
        if let Some(dumper) = &self.dumper {
            dumper.dump(&proxy);
        }
        info!("代理类生成完成: {}, 拦截方法数: {}", name, proxy.intercepted_methods().len());
        Ok(proxy)
    }
}

/// 选择需要拦截的方法：接口（含父接口）的全部方法，以及父类链上可重写的公开方法。
/// 按签名去重，先出现者优先。父类链上 final 或合成方法的签名、根类型方法的签名一律不拦截，
/// 无论接口是否重新声明。
fn select_methods(superclass: &Arc<ClassDescriptor>, interfaces: &[Arc<ClassDescriptor>]) -> Vec<MethodDescriptor> {
    let interface_types: Vec<Arc<ClassDescriptor>> = interfaces
        .iter()
        .flat_map(|interface| std::iter::once(interface.clone()).chain(interface.all_interfaces()))
        .collect();
    let classes: Vec<Arc<ClassDescriptor>> = superclass.ancestors().take_while(|class| !class.is_root()).collect();

    let interface_methods = interface_types.iter().flat_map(|interface| interface.methods());
    let class_methods = classes
        .iter()
        .flat_map(|class| class.methods())
        .filter(|method| method.visibility == Visibility::Public);

    let root = ClassDescriptor::object_root();
    let mut seen: Vec<&MethodDescriptor> = classes
        .iter()
        .flat_map(|class| class.methods())
        .filter(|method| method.is_final || method.is_synthetic)
        .chain(root.methods())
        .collect();

    let mut selected = Vec::new();
    for method in interface_methods.chain(class_methods) {
        if method.is_synthetic || method.is_final || seen.iter().any(|m| m.same_signature(method)) {
            continue;
        }
        seen.push(method);
        selected.push(method.clone());
    }
    selected
}

fn check_signature(class_name: &str, method: &MethodDescriptor) -> Result<(), ReflectError> {
    if method.name.trim().is_empty() {
        return Err(ReflectError::compilation_failure(class_name, "方法名为空"));
    }
    if method.params.iter().any(|param| *param == TypeRef::Void) {
        return Err(ReflectError::compilation_failure(
            class_name,
            format!("方法 {}{} 的参数不能为 void", method.name, format_params(&method.params)),
        ));
    }
    Ok(())
}

/// 生成拦截方法体：装箱参数 → 取处理器 → 调用 → 转换返回值。处理器抛出的异常原样传播。
fn intercepting_method(method: &MethodDescriptor) -> MethodDescriptor {
    let name = method.name.clone();
    let params = method.params.clone();
    let return_type = method.return_type.clone();

    let mut generated = MethodDescriptor::new(name.clone(), params.clone(), return_type.clone())
        .with_visibility(method.visibility)
        .with_body(move |proxy, args| {
            let args = box_arguments(&params, args)?;
            let handler = proxy.handler().ok_or_else(|| {
                Exception::illegal_state(format!("代理实例未绑定拦截处理器: {}", proxy.class().name()))
            })?;
            let result = handler.invoke(proxy, &name, args)?;
            convert_return(&return_type, result)
        });
    generated.exceptions = method.exceptions.clone();
    generated
}
