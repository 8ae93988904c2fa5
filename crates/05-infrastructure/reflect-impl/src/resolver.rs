//! 成员解析器实现

use infrastructure_common::{format_params, ClassDescriptor, ReflectError, TypeRef, TypeRegistry};
use reflect_abstractions::{MemberResolver, ResolvedConstructor, ResolvedField};
use std::sync::Arc;
use tracing::debug;

/// 默认成员解析器
///
/// 构造器重载按“精确匹配 → 同元数下逐参数可赋值或装箱等价”的顺序查找，
/// 第一个语法匹配者胜出，不做评分。
#[derive(Debug, Clone)]
pub struct DefaultMemberResolver {
    registry: Arc<TypeRegistry>,
}

impl DefaultMemberResolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    fn default_constructor(&self, owner: &ClassDescriptor) -> Result<usize, ReflectError> {
        let constructors = owner.constructors();
        if let Some(index) = constructors.iter().position(|c| c.params.is_empty()) {
            return Ok(index);
        }

        match constructors.len() {
            0 => Err(ReflectError::member_not_found(owner.name(), "<init>()")),
            1 => {
                debug!(
                    "{} 没有无参构造器，使用唯一声明的构造器 {}",
                    owner.name(),
                    constructors[0].signature()
                );
                Ok(0)
            }
            candidates => Err(ReflectError::AmbiguousConstructor {
                owner: owner.name().to_string(),
                candidates,
            }),
        }
    }

    fn matching_constructor(&self, owner: &ClassDescriptor, requested: &[TypeRef]) -> Option<usize> {
        let constructors = owner.constructors();
        constructors
            .iter()
            .position(|c| c.params == requested)
            .or_else(|| {
                constructors.iter().position(|c| {
                    c.params.len() == requested.len()
                        && c.params
                            .iter()
                            .zip(requested)
                            .all(|(param, ty)| self.registry.is_assignable(param, ty))
                })
            })
    }
}

impl MemberResolver for DefaultMemberResolver {
    fn resolve_constructor(
        &self,
        owner: &Arc<ClassDescriptor>,
        params: Option<&[TypeRef]>,
    ) -> Result<ResolvedConstructor, ReflectError> {
        if owner.is_interface() {
            return Err(ReflectError::member_not_found(owner.name(), "<init>"));
        }

        let index = match params {
            None => self.default_constructor(owner)?,
            Some(requested) => self.matching_constructor(owner, requested).ok_or_else(|| {
                ReflectError::member_not_found(owner.name(), format!("<init>{}", format_params(requested)))
            })?,
        };

        let resolved = ResolvedConstructor {
            owner: owner.clone(),
            index,
        };
        debug!("解析构造器: {}", resolved.display_name());
        Ok(resolved)
    }

    fn resolve_field(&self, owner: &Arc<ClassDescriptor>, name: &str) -> Result<ResolvedField, ReflectError> {
        for class in owner.ancestors().take_while(|class| !class.is_root()) {
            if let Some(index) = class.fields().iter().position(|field| &*field.name == name) {
                let resolved = ResolvedField {
                    owner: owner.clone(),
                    declaring: class,
                    index,
                };
                debug!("解析字段: {} (请求类型 {})", resolved.display_name(), owner.name());
                return Ok(resolved);
            }
        }

        Err(ReflectError::member_not_found(owner.name(), name))
    }
}
