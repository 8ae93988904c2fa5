//! 运行时类型模型
//!
//! 描述可被容器构造、访问和代理的类：类型引用、成员描述符以及类描述符。
//! 这些元数据由元数据扫描器产出，一经构建便不可变。

use crate::errors::{Exception, ReflectError};
use crate::value::{ObjectRef, Value};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 通用根类型名称
pub const OBJECT_CLASS: &str = "Object";

/// 基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    /// 全部八种基本类型
    pub const ALL: [Self; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// 基本类型名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// 对应包装类型名称
    pub const fn wrapper_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Char => "Character",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }

    /// 从基本类型名称解析
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// 从包装类型名称解析
    pub fn from_wrapper_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.wrapper_name() == name)
    }

    /// 零值
    pub fn default_value(self) -> Value {
        match self {
            Self::Boolean => Value::Boolean(false),
            Self::Byte => Value::Byte(0),
            Self::Short => Value::Short(0),
            Self::Char => Value::Char('\0'),
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Float => Value::Float(0.0),
            Self::Double => Value::Double(0.0),
        }
    }
}

/// 类型引用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// 无返回值
    Void,
    /// 基本类型
    Primitive(Primitive),
    /// 包装类型
    Boxed(Primitive),
    /// 字符串
    String,
    /// 类或接口，按名称引用
    Class(Arc<str>),
}

impl TypeRef {
    /// 根类型
    pub fn object() -> Self {
        Self::Class(Arc::from(OBJECT_CLASS))
    }

    /// 按名称引用类
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::Class(name.into())
    }

    /// 解析类型名称：基本类型、包装类型、`String`、`void`，其余视为类名
    pub fn parse(name: &str) -> Self {
        match name {
            "void" => Self::Void,
            "String" => Self::String,
            _ => Primitive::from_name(name)
                .map(Self::Primitive)
                .or_else(|| Primitive::from_wrapper_name(name).map(Self::Boxed))
                .unwrap_or_else(|| Self::Class(Arc::from(name))),
        }
    }

    /// 是否为基本类型
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// 是否为引用类型
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Boxed(_) | Self::String | Self::Class(_))
    }

    /// 是否为根类型
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Class(name) if &**name == OBJECT_CLASS)
    }

    /// 基本类型与其包装类型互为装箱等价
    pub fn is_boxing_equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(a), Self::Boxed(b)) | (Self::Boxed(a), Self::Primitive(b)) => a == b,
            _ => false,
        }
    }

    /// 字段默认值
    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(primitive) => primitive.default_value(),
            _ => Value::Null,
        }
    }

    /// 按装箱表检查值能否赋给此类型
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Void => false,
            Self::Primitive(primitive) => value.primitive() == Some(*primitive),
            Self::Boxed(primitive) => value.is_null() || value.primitive() == Some(*primitive),
            Self::String => matches!(value, Value::Null | Value::Str(_)),
            Self::Class(_) if self.is_object() => true,
            Self::Class(name) => match value {
                Value::Null => true,
                Value::Object(object) => object.is_instance_of(name),
                _ => false,
            },
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Primitive(primitive) => f.write_str(primitive.name()),
            Self::Boxed(primitive) => f.write_str(primitive.wrapper_name()),
            Self::String => f.write_str("String"),
            Self::Class(name) => f.write_str(name),
        }
    }
}

/// 格式化参数列表，如 `(String, int)`
pub fn format_params(params: &[TypeRef]) -> String {
    let names: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("({})", names.join(", "))
}

/// 成员可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
}

/// 构造器体：初始化一个已分配的实例
pub type ConstructorBody = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<(), Exception> + Send + Sync>;

/// 方法体：在接收者上执行
pub type MethodBody = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<Value, Exception> + Send + Sync>;

/// 原生构造入口：编译期生成的专用构造代码
pub type NativeConstructor =
    Arc<dyn Fn(&Arc<ClassDescriptor>, &[Value]) -> Result<ObjectRef, Exception> + Send + Sync>;

/// 原生字段访问入口
#[derive(Clone)]
pub struct NativeAccessor {
    pub get: Arc<dyn Fn(&ObjectRef) -> Value + Send + Sync>,
    pub set: Arc<dyn Fn(&ObjectRef, Value) + Send + Sync>,
}

impl NativeAccessor {
    /// 由读写闭包创建访问入口
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&ObjectRef) -> Value + Send + Sync + 'static,
        S: Fn(&ObjectRef, Value) + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }
}

/// 构造器描述符
#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub params: Vec<TypeRef>,
    pub visibility: Visibility,
    pub body: ConstructorBody,
    pub native: Option<NativeConstructor>,
}

impl ConstructorDescriptor {
    /// 创建构造器描述符
    pub fn new<F>(params: Vec<TypeRef>, body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<(), Exception> + Send + Sync + 'static,
    {
        Self {
            params,
            visibility: Visibility::Public,
            body: Arc::new(body),
            native: None,
        }
    }

    /// 空的无参构造器
    pub fn no_arg() -> Self {
        Self::new(Vec::new(), |_, _| Ok(()))
    }

    /// 设置可见性
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// 设为私有
    pub fn private(self) -> Self {
        self.with_visibility(Visibility::Private)
    }

    /// 附加原生构造入口
    pub fn with_native<F>(mut self, native: F) -> Self
    where
        F: Fn(&Arc<ClassDescriptor>, &[Value]) -> Result<ObjectRef, Exception> + Send + Sync + 'static,
    {
        self.native = Some(Arc::new(native));
        self
    }

    /// 参数签名，如 `(String, int)`
    pub fn signature(&self) -> String {
        format_params(&self.params)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .field("native", &self.native.is_some())
            .finish()
    }
}

/// 字段描述符
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: Arc<str>,
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub is_final: bool,
    pub native: Option<NativeAccessor>,
}

impl FieldDescriptor {
    /// 创建公开的可写字段
    pub fn new(name: impl Into<Arc<str>>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            is_final: false,
            native: None,
        }
    }

    /// 设置可见性
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// 设为私有
    pub fn private(self) -> Self {
        self.with_visibility(Visibility::Private)
    }

    /// 标记为 final
    pub fn final_field(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// 附加原生访问入口
    pub fn with_native(mut self, accessor: NativeAccessor) -> Self {
        self.native = Some(accessor);
        self
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("visibility", &self.visibility)
            .field("is_final", &self.is_final)
            .field("native", &self.native.is_some())
            .finish()
    }
}

/// 方法描述符，`body` 为空表示抽象方法
#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: Arc<str>,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub visibility: Visibility,
    pub is_final: bool,
    pub is_synthetic: bool,
    /// 声明的受检异常
    pub exceptions: Vec<Arc<str>>,
    pub body: Option<MethodBody>,
}

impl MethodDescriptor {
    /// 创建抽象方法描述符
    pub fn new(name: impl Into<Arc<str>>, params: Vec<TypeRef>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            visibility: Visibility::Public,
            is_final: false,
            is_synthetic: false,
            exceptions: Vec::new(),
            body: None,
        }
    }

    /// 附加方法体
    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, Exception> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// 设置可见性
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// 标记为 final
    pub fn final_method(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// 标记为合成方法
    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }

    /// 声明受检异常
    pub fn throws(mut self, exception: impl Into<Arc<str>>) -> Self {
        self.exceptions.push(exception.into());
        self
    }

    /// 是否为抽象方法
    pub const fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// 名称与参数列表相同
    pub fn same_signature(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }

    /// 参数列表是否接受给定实参
    pub fn accepts(&self, name: &str, args: &[Value]) -> bool {
        &*self.name == name
            && self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(param, arg)| param.accepts(arg))
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("is_final", &self.is_final)
            .field("is_synthetic", &self.is_synthetic)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// 类描述符
#[derive(Debug)]
pub struct ClassDescriptor {
    name: Arc<str>,
    kind: ClassKind,
    superclass: Option<Arc<ClassDescriptor>>,
    interfaces: Vec<Arc<ClassDescriptor>>,
    constructors: Vec<ConstructorDescriptor>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    open_to_handles: bool,
    synthetic: bool,
}

static OBJECT_ROOT: Lazy<Arc<ClassDescriptor>> = Lazy::new(|| {
    let methods = vec![
        MethodDescriptor::new("equals", vec![TypeRef::object()], TypeRef::Primitive(Primitive::Boolean))
            .with_body(|this, args| {
                Ok(Value::Boolean(matches!(&args[0], Value::Object(other) if other == this)))
            }),
        MethodDescriptor::new("hashCode", Vec::new(), TypeRef::Primitive(Primitive::Int))
            .with_body(|this, _| Ok(Value::Int(this.identity_hash()))),
        MethodDescriptor::new("toString", Vec::new(), TypeRef::String)
            .with_body(|this, _| Ok(Value::from(format!("{this:?}")))),
    ];

    Arc::new(ClassDescriptor {
        name: Arc::from(OBJECT_CLASS),
        kind: ClassKind::Class,
        superclass: None,
        interfaces: Vec::new(),
        constructors: vec![ConstructorDescriptor::no_arg()],
        fields: Vec::new(),
        methods,
        open_to_handles: true,
        synthetic: false,
    })
});

impl ClassDescriptor {
    /// 通用根类型
    pub fn object_root() -> Arc<Self> {
        OBJECT_ROOT.clone()
    }

    /// 完全限定类名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 类名的共享引用
    pub fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    /// 简短名称（不含命名空间）
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// 类型种类
    pub const fn kind(&self) -> ClassKind {
        self.kind
    }

    /// 是否为接口
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// 是否为通用根类型
    pub fn is_root(&self) -> bool {
        &*self.name == OBJECT_CLASS && self.superclass.is_none() && self.kind == ClassKind::Class
    }

    /// 直接父类，根类型与接口为空
    pub fn superclass(&self) -> Option<&Arc<Self>> {
        self.superclass.as_ref()
    }

    /// 直接实现的接口
    pub fn interfaces(&self) -> &[Arc<Self>] {
        &self.interfaces
    }

    /// 声明的构造器
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// 声明的实例字段
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// 声明的方法
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// 类型句柄是否可以绑定非公开成员
    pub const fn open_to_handles(&self) -> bool {
        self.open_to_handles
    }

    /// 是否为运行时生成的类
    pub const fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// 无参构造器
    pub fn no_arg_constructor(&self) -> Option<&ConstructorDescriptor> {
        self.constructors.iter().find(|c| c.params.is_empty())
    }

    /// 自身及所有父类，由近及远
    pub fn ancestors(self: &Arc<Self>) -> impl Iterator<Item = Arc<Self>> {
        std::iter::successors(Some(self.clone()), |class| class.superclass.clone())
    }

    /// 自身、父类及其实现的全部接口中是否存在指定名称的类型
    pub fn is_subtype_of(&self, name: &str) -> bool {
        if &*self.name == name {
            return true;
        }
        if self.interfaces.iter().any(|i| i.is_subtype_of(name)) {
            return true;
        }
        self.superclass
            .as_ref()
            .is_some_and(|superclass| superclass.is_subtype_of(name))
    }

    /// 递归收集实现的全部接口（去重，声明顺序）
    pub fn all_interfaces(&self) -> Vec<Arc<Self>> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        self.collect_interfaces(&mut seen, &mut result);
        result
    }

    fn collect_interfaces(&self, seen: &mut HashSet<Arc<str>>, result: &mut Vec<Arc<Self>>) {
        for interface in &self.interfaces {
            if seen.insert(interface.name.clone()) {
                result.push(interface.clone());
                interface.collect_interfaces(seen, result);
            }
        }
        if let Some(superclass) = &self.superclass {
            superclass.collect_interfaces(seen, result);
        }
    }
}

/// 类描述符构建器
pub struct ClassBuilder {
    name: Arc<str>,
    kind: ClassKind,
    superclass: Option<Arc<ClassDescriptor>>,
    interfaces: Vec<Arc<ClassDescriptor>>,
    constructors: Vec<ConstructorDescriptor>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    open_to_handles: bool,
    synthetic: bool,
}

impl ClassBuilder {
    /// 开始构建一个类
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::with_kind(name, ClassKind::Class)
    }

    /// 开始构建一个接口
    pub fn interface(name: impl Into<Arc<str>>) -> Self {
        Self::with_kind(name, ClassKind::Interface)
    }

    fn with_kind(name: impl Into<Arc<str>>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            open_to_handles: false,
            synthetic: false,
        }
    }

    /// 设置父类
    pub fn extends(mut self, superclass: &Arc<ClassDescriptor>) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    /// 添加实现的接口
    pub fn implements(mut self, interface: &Arc<ClassDescriptor>) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// 添加字段
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// 添加构造器
    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// 添加方法
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// 是否对类型句柄开放非公开成员
    pub fn open_to_handles(mut self, open: bool) -> Self {
        self.open_to_handles = open;
        self
    }

    /// 标记为生成类
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// 校验并构建类描述符
    ///
    /// 未声明构造器的类会获得一个隐式的公开无参构造器。
    pub fn build(mut self) -> Result<Arc<ClassDescriptor>, ReflectError> {
        let type_name = self.name.to_string();
        if self.name.trim().is_empty() {
            return Err(ReflectError::invalid_metadata(type_name, "类名不能为空"));
        }

        if let Some(interface) = self.interfaces.iter().find(|i| !i.is_interface()) {
            return Err(ReflectError::invalid_metadata(
                type_name,
                format!("{} 不是接口", interface.name()),
            ));
        }

        match self.kind {
            ClassKind::Interface => {
                if self.superclass.is_some() {
                    return Err(ReflectError::invalid_metadata(type_name, "接口不能继承类"));
                }
                if !self.constructors.is_empty() || !self.fields.is_empty() {
                    return Err(ReflectError::invalid_metadata(
                        type_name,
                        "接口不能声明构造器或实例字段",
                    ));
                }
            }
            ClassKind::Class => {
                let superclass = self
                    .superclass
                    .get_or_insert_with(ClassDescriptor::object_root)
                    .clone();
                if superclass.is_interface() {
                    return Err(ReflectError::InvalidSuperclass {
                        type_name: superclass.name().to_string(),
                    });
                }
                if superclass.no_arg_constructor().is_none() {
                    return Err(ReflectError::invalid_metadata(
                        type_name,
                        format!("父类 {} 缺少无参构造器", superclass.name()),
                    ));
                }
                if self.constructors.is_empty() {
                    self.constructors.push(ConstructorDescriptor::no_arg());
                }
            }
        }

        for (index, constructor) in self.constructors.iter().enumerate() {
            if self.constructors[..index]
                .iter()
                .any(|other| other.params == constructor.params)
            {
                return Err(ReflectError::invalid_metadata(
                    type_name,
                    format!("重复的构造器签名 {}", constructor.signature()),
                ));
            }
        }

        let mut names = HashSet::new();
        if let Some(field) = self.fields.iter().find(|f| !names.insert(f.name.clone())) {
            return Err(ReflectError::invalid_metadata(
                type_name,
                format!("重复的字段 {}", field.name),
            ));
        }

        Ok(Arc::new(ClassDescriptor {
            name: self.name,
            kind: self.kind,
            superclass: self.superclass,
            interfaces: self.interfaces,
            constructors: self.constructors,
            fields: self.fields,
            methods: self.methods,
            open_to_handles: self.open_to_handles,
            synthetic: self.synthetic,
        }))
    }
}
