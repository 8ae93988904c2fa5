//! 调用器层级策略
//!
//! 原生入口 → 类型句柄 → 通用反射。三者可观察行为一致，仅开销不同。

use crate::marshal::{check_target, coerce, marshal_arguments};
use infrastructure_common::{
    ClassDescriptor, ConstructorDescriptor, FieldSlot, NativeAccessor, NativeConstructor, ObjectRef,
    ReflectError, TypeRef, Value, Visibility,
};
use reflect_abstractions::{
    ConstructorInvoker, FieldInvoker, InvokerStrategy, ResolvedConstructor, ResolvedField, Tier, TierError,
};
use std::sync::Arc;
use tracing::trace;

/// 原生层级：直接调用类元数据中登记的原生入口
#[derive(Debug, Clone)]
pub struct NativeStrategy {
    enabled: bool,
}

impl NativeStrategy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl InvokerStrategy for NativeStrategy {
    fn tier(&self) -> Tier {
        Tier::Native
    }

    fn compile_constructor(&self, member: &ResolvedConstructor) -> Result<Arc<dyn ConstructorInvoker>, TierError> {
        if !self.enabled {
            return Err(TierError::Disabled { tier: Tier::Native });
        }
        let descriptor = member.descriptor();
        let entry = descriptor.native.clone().ok_or_else(|| TierError::NoNativeEntry {
            member: member.display_name(),
        })?;

        Ok(Arc::new(NativeConstructorInvoker {
            owner: member.owner.clone(),
            params: descriptor.params.clone(),
            entry,
        }))
    }

    fn compile_field(&self, member: &ResolvedField) -> Result<Arc<dyn FieldInvoker>, TierError> {
        if !self.enabled {
            return Err(TierError::Disabled { tier: Tier::Native });
        }
        let descriptor = member.descriptor();
        let accessor = descriptor.native.clone().ok_or_else(|| TierError::NoNativeEntry {
            member: member.display_name(),
        })?;

        Ok(Arc::new(NativeFieldInvoker {
            declaring: member.declaring.clone(),
            name: descriptor.name.clone(),
            ty: descriptor.ty.clone(),
            accessor,
        }))
    }
}

struct NativeConstructorInvoker {
    owner: Arc<ClassDescriptor>,
    params: Vec<TypeRef>,
    entry: NativeConstructor,
}

impl ConstructorInvoker for NativeConstructorInvoker {
    fn construct(&self, args: &[Value]) -> Result<ObjectRef, ReflectError> {
        let args = marshal_arguments(&self.params, args)?;
        Ok((self.entry)(&self.owner, &args)?)
    }

    fn tier(&self) -> Tier {
        Tier::Native
    }

    fn owner(&self) -> &Arc<ClassDescriptor> {
        &self.owner
    }

    fn parameter_types(&self) -> &[TypeRef] {
        &self.params
    }
}

struct NativeFieldInvoker {
    declaring: Arc<ClassDescriptor>,
    name: Arc<str>,
    ty: TypeRef,
    accessor: NativeAccessor,
}

impl FieldInvoker for NativeFieldInvoker {
    fn get(&self, target: &ObjectRef) -> Result<Value, ReflectError> {
        check_target(&self.declaring, target)?;
        Ok((self.accessor.get)(target))
    }

    fn set(&self, target: &ObjectRef, value: Value) -> Result<(), ReflectError> {
        check_target(&self.declaring, target)?;
        let value = coerce(1, &self.ty, value)?;
        (self.accessor.set)(target, value);
        Ok(())
    }

    fn tier(&self) -> Tier {
        Tier::Native
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn field_type(&self) -> &TypeRef {
        &self.ty
    }
}

/// 类型句柄层级：编译时绑定到具体成员，调用时不再查找
#[derive(Debug, Clone)]
pub struct TypedHandleStrategy {
    enabled: bool,
}

impl TypedHandleStrategy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn check_access(&self, owner: &ClassDescriptor, visibility: Visibility, member: String) -> Result<(), TierError> {
        if !self.enabled {
            return Err(TierError::Disabled {
                tier: Tier::TypedHandle,
            });
        }
        if visibility == Visibility::Public || owner.open_to_handles() {
            Ok(())
        } else {
            Err(TierError::Inaccessible { member })
        }
    }
}

impl InvokerStrategy for TypedHandleStrategy {
    fn tier(&self) -> Tier {
        Tier::TypedHandle
    }

    fn compile_constructor(&self, member: &ResolvedConstructor) -> Result<Arc<dyn ConstructorInvoker>, TierError> {
        let descriptor = member.descriptor();
        self.check_access(&member.owner, descriptor.visibility, member.display_name())?;

        Ok(Arc::new(HandleConstructorInvoker {
            owner: member.owner.clone(),
            constructor: descriptor.clone(),
        }))
    }

    fn compile_field(&self, member: &ResolvedField) -> Result<Arc<dyn FieldInvoker>, TierError> {
        let descriptor = member.descriptor();
        self.check_access(&member.declaring, descriptor.visibility, member.display_name())?;
        if descriptor.is_final {
            return Err(TierError::FinalField {
                member: member.display_name(),
            });
        }

        Ok(Arc::new(HandleFieldInvoker {
            declaring: member.declaring.clone(),
            slot: member.slot(),
            ty: descriptor.ty.clone(),
        }))
    }
}

struct HandleConstructorInvoker {
    owner: Arc<ClassDescriptor>,
    constructor: ConstructorDescriptor,
}

impl ConstructorInvoker for HandleConstructorInvoker {
    fn construct(&self, args: &[Value]) -> Result<ObjectRef, ReflectError> {
        let args = marshal_arguments(&self.constructor.params, args)?;
        Ok(ObjectRef::construct(&self.owner, &self.constructor, &args)?)
    }

    fn tier(&self) -> Tier {
        Tier::TypedHandle
    }

    fn owner(&self) -> &Arc<ClassDescriptor> {
        &self.owner
    }

    fn parameter_types(&self) -> &[TypeRef] {
        &self.constructor.params
    }
}

struct HandleFieldInvoker {
    declaring: Arc<ClassDescriptor>,
    slot: FieldSlot,
    ty: TypeRef,
}

impl FieldInvoker for HandleFieldInvoker {
    fn get(&self, target: &ObjectRef) -> Result<Value, ReflectError> {
        check_target(&self.declaring, target)?;
        target
            .read_slot(&self.slot)
            .ok_or_else(|| ReflectError::member_not_found(target.class().name(), &*self.slot.name))
    }

    fn set(&self, target: &ObjectRef, value: Value) -> Result<(), ReflectError> {
        check_target(&self.declaring, target)?;
        let value = coerce(1, &self.ty, value)?;
        if target.write_slot(&self.slot, value) {
            Ok(())
        } else {
            Err(ReflectError::member_not_found(target.class().name(), &*self.slot.name))
        }
    }

    fn tier(&self) -> Tier {
        Tier::TypedHandle
    }

    fn name(&self) -> &str {
        &self.slot.name
    }

    fn field_type(&self) -> &TypeRef {
        &self.ty
    }
}

/// 通用反射层级：每次调用按签名或名称重新查找成员，忽略可见性
#[derive(Debug, Clone, Default)]
pub struct ReflectiveStrategy;

impl InvokerStrategy for ReflectiveStrategy {
    fn tier(&self) -> Tier {
        Tier::Reflective
    }

    fn compile_constructor(&self, member: &ResolvedConstructor) -> Result<Arc<dyn ConstructorInvoker>, TierError> {
        Ok(Arc::new(ReflectiveConstructorInvoker {
            owner: member.owner.clone(),
            params: member.params().to_vec(),
        }))
    }

    fn compile_field(&self, member: &ResolvedField) -> Result<Arc<dyn FieldInvoker>, TierError> {
        let descriptor = member.descriptor();
        Ok(Arc::new(ReflectiveFieldInvoker {
            owner: member.owner.clone(),
            name: descriptor.name.clone(),
            ty: descriptor.ty.clone(),
        }))
    }
}

struct ReflectiveConstructorInvoker {
    owner: Arc<ClassDescriptor>,
    params: Vec<TypeRef>,
}

impl ConstructorInvoker for ReflectiveConstructorInvoker {
    fn construct(&self, args: &[Value]) -> Result<ObjectRef, ReflectError> {
        let constructor = self
            .owner
            .constructors()
            .iter()
            .find(|c| c.params == self.params)
            .ok_or_else(|| ReflectError::member_not_found(self.owner.name(), "<init>"))?;
        trace!("反射调用构造器: {}.<init>{}", self.owner.name(), constructor.signature());

        let args = marshal_arguments(&constructor.params, args)?;
        Ok(ObjectRef::construct(&self.owner, constructor, &args)?)
    }

    fn tier(&self) -> Tier {
        Tier::Reflective
    }

    fn owner(&self) -> &Arc<ClassDescriptor> {
        &self.owner
    }

    fn parameter_types(&self) -> &[TypeRef] {
        &self.params
    }
}

struct ReflectiveFieldInvoker {
    owner: Arc<ClassDescriptor>,
    name: Arc<str>,
    ty: TypeRef,
}

impl ReflectiveFieldInvoker {
    fn lookup(&self, target: &ObjectRef) -> Result<FieldSlot, ReflectError> {
        let declaring = self
            .owner
            .ancestors()
            .take_while(|class| !class.is_root())
            .find(|class| class.fields().iter().any(|field| field.name == self.name))
            .ok_or_else(|| ReflectError::member_not_found(self.owner.name(), &*self.name))?;
        check_target(&declaring, target)?;
        trace!("反射访问字段: {}.{}", declaring.name(), self.name);
        Ok(FieldSlot::new(declaring.name_arc(), self.name.clone()))
    }
}

impl FieldInvoker for ReflectiveFieldInvoker {
    fn get(&self, target: &ObjectRef) -> Result<Value, ReflectError> {
        let slot = self.lookup(target)?;
        target
            .read_slot(&slot)
            .ok_or_else(|| ReflectError::member_not_found(target.class().name(), &*self.name))
    }

    fn set(&self, target: &ObjectRef, value: Value) -> Result<(), ReflectError> {
        let slot = self.lookup(target)?;
        let value = coerce(1, &self.ty, value)?;
        if target.write_slot(&slot, value) {
            Ok(())
        } else {
            Err(ReflectError::member_not_found(target.class().name(), &*self.name))
        }
    }

    fn tier(&self) -> Tier {
        Tier::Reflective
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn field_type(&self) -> &TypeRef {
        &self.ty
    }
}
