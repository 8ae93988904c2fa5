//! 类型注册表
//!
//! 充当类加载器：按唯一名称定义类，拒绝重复定义，并回答类型可赋值性问题。

use crate::errors::ReflectError;
use crate::metadata::{ClassDescriptor, TypeRef, OBJECT_CLASS};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 类型注册表
#[derive(Debug)]
pub struct TypeRegistry {
    classes: DashMap<Arc<str>, Arc<ClassDescriptor>>,
}

impl TypeRegistry {
    /// 创建新的注册表，预置根类型
    pub fn new() -> Self {
        let classes = DashMap::new();
        classes.insert(Arc::from(OBJECT_CLASS), ClassDescriptor::object_root());
        Self { classes }
    }

    /// 定义类，同名类已存在时失败
    pub fn define(&self, class: Arc<ClassDescriptor>) -> Result<Arc<ClassDescriptor>, ReflectError> {
        match self.classes.entry(class.name_arc()) {
            Entry::Occupied(_) => Err(ReflectError::DuplicateClass {
                name: class.name().to_string(),
            }),
            Entry::Vacant(entry) => {
                if class.is_synthetic() {
                    debug!("定义生成类: {}", class.name());
                } else {
                    info!("定义类: {}", class.name());
                }
                entry.insert(class.clone());
                Ok(class)
            }
        }
    }

    /// 按名称获取类
    pub fn get(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    /// 获取类，不存在时返回 `ClassNotFound`
    pub fn require(&self, name: &str) -> Result<Arc<ClassDescriptor>, ReflectError> {
        self.get(name).ok_or_else(|| ReflectError::ClassNotFound {
            name: name.to_string(),
        })
    }

    /// 是否已定义指定名称的类
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// 已定义的类数量（含根类型）
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// 已定义的类名（排序）
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.iter().map(|e| e.key().to_string()).collect();
        names.sort();
        names
    }

    /// `source` 类型的值能否赋给 `target` 类型（含装箱等价）
    pub fn is_assignable(&self, target: &TypeRef, source: &TypeRef) -> bool {
        if target == source || target.is_boxing_equivalent(source) {
            return true;
        }
        match (target, source) {
            (TypeRef::Class(_), _) if target.is_object() => source.is_reference(),
            (TypeRef::Class(target_name), TypeRef::Class(source_name)) => self
                .get(source_name)
                .is_some_and(|class| class.is_subtype_of(target_name)),
            _ => false,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
