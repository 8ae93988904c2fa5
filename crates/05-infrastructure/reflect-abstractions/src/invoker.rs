//! 调用器抽象接口
//!
//! 编译后的构造与字段访问原语。调用方只依赖这些契约，看不到具体层级。

use infrastructure_common::{format_params, ClassDescriptor, ObjectRef, ReflectError, TypeRef, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 调用器实现层级，按性能从高到低排列
///
/// 层级仅用于诊断，不同层级的可观察行为完全一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// 编译期生成的原生入口
    Native,
    /// 直接绑定到成员的类型句柄
    TypedHandle,
    /// 每次调用按名称/签名查找的通用反射
    Reflective,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::TypedHandle => "typed-handle",
            Self::Reflective => "reflective",
        })
    }
}

/// 构造器调用器
pub trait ConstructorInvoker: Send + Sync {
    /// 按位置参数构造实例
    fn construct(&self, args: &[Value]) -> Result<ObjectRef, ReflectError>;

    /// 实现层级
    fn tier(&self) -> Tier;

    /// 被构造的类
    fn owner(&self) -> &Arc<ClassDescriptor>;

    /// 解析后的参数类型
    fn parameter_types(&self) -> &[TypeRef];
}

/// 字段调用器
pub trait FieldInvoker: Send + Sync {
    /// 读取字段
    fn get(&self, target: &ObjectRef) -> Result<Value, ReflectError>;

    /// 写入字段
    fn set(&self, target: &ObjectRef, value: Value) -> Result<(), ReflectError>;

    /// 实现层级
    fn tier(&self) -> Tier;

    /// 字段名称
    fn name(&self) -> &str;

    /// 字段类型
    fn field_type(&self) -> &TypeRef;
}

/// 编译后的调用器
#[derive(Clone)]
pub enum CompiledInvoker {
    Constructor(Arc<dyn ConstructorInvoker>),
    Field(Arc<dyn FieldInvoker>),
}

impl CompiledInvoker {
    pub fn tier(&self) -> Tier {
        match self {
            Self::Constructor(invoker) => invoker.tier(),
            Self::Field(invoker) => invoker.tier(),
        }
    }

    pub fn as_constructor(&self) -> Option<&Arc<dyn ConstructorInvoker>> {
        match self {
            Self::Constructor(invoker) => Some(invoker),
            Self::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&Arc<dyn FieldInvoker>> {
        match self {
            Self::Field(invoker) => Some(invoker),
            Self::Constructor(_) => None,
        }
    }

    /// 两个句柄是否指向同一个编译产物
    pub fn same_artifact(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Constructor(a), Self::Constructor(b)) => Arc::ptr_eq(a, b),
            (Self::Field(a), Self::Field(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for CompiledInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor(invoker) => write!(
                f,
                "ConstructorInvoker({}{}, {})",
                invoker.owner().name(),
                format_params(invoker.parameter_types()),
                invoker.tier()
            ),
            Self::Field(invoker) => {
                write!(f, "FieldInvoker({}, {})", invoker.name(), invoker.tier())
            }
        }
    }
}

/// 按同一性比较的类引用
///
/// 同名但独立构建的两个类描述符是不同的键；键持有描述符，缓存存活期间地址不会被复用。
#[derive(Clone)]
pub struct ClassIdentity(Arc<ClassDescriptor>);

impl ClassIdentity {
    pub fn new(class: &Arc<ClassDescriptor>) -> Self {
        Self(class.clone())
    }

    /// 被引用的类
    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.0
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl PartialEq for ClassIdentity {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassIdentity {}

impl Hash for ClassIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for ClassIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.0.name(), Arc::as_ptr(&self.0))
    }
}

/// 可编译单元的缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKey {
    Constructor {
        owner: ClassIdentity,
        params: Option<Vec<TypeRef>>,
    },
    Field {
        owner: ClassIdentity,
        name: Arc<str>,
    },
}

impl MemberKey {
    /// 构造器键；`params` 为空表示默认构造器请求
    pub fn constructor(owner: &Arc<ClassDescriptor>, params: Option<&[TypeRef]>) -> Self {
        Self::Constructor {
            owner: ClassIdentity::new(owner),
            params: params.map(<[TypeRef]>::to_vec),
        }
    }

    /// 字段键
    pub fn field(owner: &Arc<ClassDescriptor>, name: &str) -> Self {
        Self::Field {
            owner: ClassIdentity::new(owner),
            name: Arc::from(name),
        }
    }

    /// 所有者类名
    pub fn owner(&self) -> &str {
        match self {
            Self::Constructor { owner, .. } | Self::Field { owner, .. } => owner.name(),
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor { owner, params: Some(params) } => {
                write!(f, "{}.<init>{}", owner.name(), format_params(params))
            }
            Self::Constructor { owner, params: None } => write!(f, "{}.<init>(*)", owner.name()),
            Self::Field { owner, name } => write!(f, "{}.{name}", owner.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure_common::{ClassBuilder, Primitive};

    #[test]
    fn member_keys_are_structural() {
        let class = ClassBuilder::class("app.Person").build().unwrap();
        let params = [TypeRef::String, TypeRef::Primitive(Primitive::Int)];

        assert_eq!(
            MemberKey::constructor(&class, Some(&params)),
            MemberKey::constructor(&class, Some(&params))
        );
        assert_ne!(
            MemberKey::constructor(&class, Some(&params)),
            MemberKey::constructor(&class, None)
        );
        assert_eq!(MemberKey::field(&class, "age"), MemberKey::field(&class, "age"));
        assert_eq!(
            MemberKey::constructor(&class, Some(&params)).to_string(),
            "app.Person.<init>(String, int)"
        );
        assert_eq!(MemberKey::field(&class, "age").owner(), "app.Person");
    }

    #[test]
    fn same_named_classes_have_distinct_keys() {
        let first = ClassBuilder::class("app.Person").build().unwrap();
        let second = ClassBuilder::class("app.Person").build().unwrap();

        assert_ne!(MemberKey::field(&first, "age"), MemberKey::field(&second, "age"));
        assert_ne!(MemberKey::constructor(&first, None), MemberKey::constructor(&second, None));
        assert_eq!(
            MemberKey::field(&first, "age").to_string(),
            MemberKey::field(&second, "age").to_string()
        );
    }

    #[test]
    fn tiers_are_ordered_by_speed() {
        assert!(Tier::Native < Tier::TypedHandle);
        assert!(Tier::TypedHandle < Tier::Reflective);
        assert_eq!(Tier::TypedHandle.to_string(), "typed-handle");
    }
}
