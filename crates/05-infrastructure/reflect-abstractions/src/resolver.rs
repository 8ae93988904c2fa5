//! 成员解析器抽象接口

use infrastructure_common::{
    ClassDescriptor, ConstructorDescriptor, FieldDescriptor, FieldSlot, ReflectError, TypeRef,
};
use std::sync::Arc;

/// 已解析的构造器
#[derive(Debug, Clone)]
pub struct ResolvedConstructor {
    /// 所属类
    pub owner: Arc<ClassDescriptor>,
    /// 在所属类构造器列表中的位置
    pub index: usize,
}

impl ResolvedConstructor {
    pub fn descriptor(&self) -> &ConstructorDescriptor {
        &self.owner.constructors()[self.index]
    }

    pub fn params(&self) -> &[TypeRef] {
        &self.descriptor().params
    }

    /// 诊断用名称，如 `app.Person.<init>(String, int)`
    pub fn display_name(&self) -> String {
        format!("{}.<init>{}", self.owner.name(), self.descriptor().signature())
    }
}

/// 已解析的字段
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// 请求时指定的类
    pub owner: Arc<ClassDescriptor>,
    /// 实际声明该字段的类（所有者本身或其父类）
    pub declaring: Arc<ClassDescriptor>,
    /// 在声明类字段列表中的位置
    pub index: usize,
}

impl ResolvedField {
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.declaring.fields()[self.index]
    }

    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    pub fn slot(&self) -> FieldSlot {
        FieldSlot::new(self.declaring.name_arc(), self.descriptor().name.clone())
    }

    pub fn display_name(&self) -> String {
        format!("{}.{}", self.declaring.name(), self.name())
    }
}

/// 成员解析器 trait
///
/// 根据目标类型和请求签名定位具体的类成员
pub trait MemberResolver: Send + Sync {
    /// 解析构造器；`params` 为空时优先选择无参构造器
    fn resolve_constructor(
        &self,
        owner: &Arc<ClassDescriptor>,
        params: Option<&[TypeRef]>,
    ) -> Result<ResolvedConstructor, ReflectError>;

    /// 解析字段，沿父类链查找
    fn resolve_field(&self, owner: &Arc<ClassDescriptor>, name: &str) -> Result<ResolvedField, ReflectError>;
}
