//! 运行时值与对象实例

use crate::errors::Exception;
use crate::interception::InterceptionHandler;
use crate::metadata::{ClassDescriptor, ConstructorDescriptor, Primitive};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// 动态类型值
///
/// 基本类型值同时代表其包装形式，装箱与拆箱只发生在类型层面。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    Object(ObjectRef),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 值对应的基本类型
    pub const fn primitive(&self) -> Option<Primitive> {
        match self {
            Self::Boolean(_) => Some(Primitive::Boolean),
            Self::Byte(_) => Some(Primitive::Byte),
            Self::Short(_) => Some(Primitive::Short),
            Self::Char(_) => Some(Primitive::Char),
            Self::Int(_) => Some(Primitive::Int),
            Self::Long(_) => Some(Primitive::Long),
            Self::Float(_) => Some(Primitive::Float),
            Self::Double(_) => Some(Primitive::Double),
            Self::Null | Self::Str(_) | Self::Object(_) => None,
        }
    }

    /// 运行时类型名称，基本类型值按装箱后的类型报告
    pub fn type_name(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Str(_) => "String".to_string(),
            Self::Object(object) => object.class().name().to_string(),
            other => other
                .primitive()
                .map(|p| p.wrapper_name().to_string())
                .unwrap_or_default(),
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub const fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    char => Char,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    ObjectRef => Object,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Arc::from(value))
    }
}

/// 字段槽位：声明类 + 字段名
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldSlot {
    pub owner: Arc<str>,
    pub name: Arc<str>,
}

impl FieldSlot {
    /// 创建字段槽位
    pub fn new(owner: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// 对象实例
struct Instance {
    class: Arc<ClassDescriptor>,
    fields: RwLock<HashMap<FieldSlot, Value>>,
    /// 代理实例的拦截处理器，分配后绑定一次
    handler: OnceCell<Arc<dyn InterceptionHandler>>,
}

/// 对象引用，相等性为同一性
#[derive(Clone)]
pub struct ObjectRef(Arc<Instance>);

impl ObjectRef {
    /// 原始分配：所有字段为默认值，不执行任何构造器
    pub fn allocate(class: &Arc<ClassDescriptor>) -> Self {
        let mut fields = HashMap::new();
        for ancestor in class.ancestors() {
            for field in ancestor.fields() {
                fields.insert(
                    FieldSlot::new(ancestor.name_arc(), field.name.clone()),
                    field.ty.default_value(),
                );
            }
        }

        Self(Arc::new(Instance {
            class: class.clone(),
            fields: RwLock::new(fields),
            handler: OnceCell::new(),
        }))
    }

    /// 分配并初始化
    pub fn construct(
        class: &Arc<ClassDescriptor>,
        constructor: &ConstructorDescriptor,
        args: &[Value],
    ) -> Result<Self, Exception> {
        let object = Self::allocate(class);
        object.initialize(constructor, args)?;
        Ok(object)
    }

    /// 先由根向下执行父类无参构造器，再执行给定构造器体
    pub fn initialize(&self, constructor: &ConstructorDescriptor, args: &[Value]) -> Result<(), Exception> {
        if let Some(superclass) = self.class().superclass() {
            self.run_superclass_chain(superclass)?;
        }
        (constructor.body)(self, args)
    }

    fn run_superclass_chain(&self, class: &Arc<ClassDescriptor>) -> Result<(), Exception> {
        if let Some(superclass) = class.superclass() {
            self.run_superclass_chain(superclass)?;
        }
        match class.no_arg_constructor() {
            Some(constructor) => (constructor.body)(self, &[]),
            None => Err(Exception::no_such_method(format!(
                "{}.<init>()",
                class.name()
            ))),
        }
    }

    /// 运行时类
    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.0.class
    }

    /// 是否为指定类型或其子类型的实例
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        self.0.class.is_subtype_of(type_name)
    }

    /// 是否为同一对象
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// 基于地址的同一性哈希
    pub fn identity_hash(&self) -> i32 {
        let address = Arc::as_ptr(&self.0) as usize as u64;
        (address ^ (address >> 32)) as i32
    }

    /// 按名称查找字段槽位，从运行时类向父类查找
    pub fn field_slot(&self, name: &str) -> Option<FieldSlot> {
        self.0.class.ancestors().find_map(|class| {
            class
                .fields()
                .iter()
                .find(|field| &*field.name == name)
                .map(|field| FieldSlot::new(class.name_arc(), field.name.clone()))
        })
    }

    /// 读取槽位
    pub fn read_slot(&self, slot: &FieldSlot) -> Option<Value> {
        self.0.fields.read().get(slot).cloned()
    }

    /// 写入已存在的槽位，不做类型检查
    pub fn write_slot(&self, slot: &FieldSlot, value: Value) -> bool {
        match self.0.fields.write().get_mut(slot) {
            Some(current) => {
                *current = value;
                true
            }
            None => false,
        }
    }

    /// 按名称读取字段
    pub fn get(&self, name: &str) -> Option<Value> {
        self.field_slot(name).and_then(|slot| self.read_slot(&slot))
    }

    /// 按名称写入字段，按字段类型检查值
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), Exception> {
        let value = value.into();
        let field = self
            .0
            .class
            .ancestors()
            .find_map(|class| {
                class
                    .fields()
                    .iter()
                    .find(|field| &*field.name == name)
                    .map(|field| (FieldSlot::new(class.name_arc(), field.name.clone()), field.ty.clone()))
            });

        let Some((slot, ty)) = field else {
            return Err(Exception::new("NoSuchFieldError", name.to_string()));
        };
        if !ty.accepts(&value) {
            return Err(Exception::illegal_argument(format!(
                "无法将 {} 赋给字段 {slot} ({ty})",
                value.type_name()
            )));
        }
        self.write_slot(&slot, value);
        Ok(())
    }

    /// 字段快照，键为 `声明类.字段名`
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.0
            .fields
            .read()
            .iter()
            .map(|(slot, value)| (slot.to_string(), value.clone()))
            .collect()
    }

    /// 虚分派：由最具体的类向上查找第一个接受这些实参的方法
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, Exception> {
        let mut abstract_found = false;
        for class in self.0.class.ancestors() {
            for descriptor in class.methods().iter().filter(|m| m.accepts(method, args)) {
                match &descriptor.body {
                    Some(body) => return body(self, args),
                    None => abstract_found = true,
                }
            }
        }

        let declared_on_interface = self
            .0
            .class
            .all_interfaces()
            .iter()
            .any(|interface| interface.methods().iter().any(|m| m.accepts(method, args)));

        if abstract_found || declared_on_interface {
            Err(Exception::abstract_method(format!(
                "{}.{method}",
                self.0.class.name()
            )))
        } else {
            Err(Exception::no_such_method(format!(
                "{}.{method}/{}",
                self.0.class.name(),
                args.len()
            )))
        }
    }

    /// 已绑定的拦截处理器
    pub fn handler(&self) -> Option<&Arc<dyn InterceptionHandler>> {
        self.0.handler.get()
    }

    /// 绑定拦截处理器；已绑定时返回传入的处理器
    pub fn bind_handler(
        &self,
        handler: Arc<dyn InterceptionHandler>,
    ) -> Result<(), Arc<dyn InterceptionHandler>> {
        self.0.handler.set(handler)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.class.name(), self.identity_hash())
    }
}
