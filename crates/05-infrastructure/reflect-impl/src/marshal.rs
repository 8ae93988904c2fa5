//! 参数与返回值编组

use infrastructure_common::{ClassDescriptor, Exception, ObjectRef, Primitive, ReflectError, TypeRef, Value};

/// 按参数类型检查并编组位置参数
pub(crate) fn marshal_arguments(params: &[TypeRef], args: &[Value]) -> Result<Vec<Value>, ReflectError> {
    if params.len() != args.len() {
        return Err(ReflectError::argument_mismatch(
            params.len().min(args.len()),
            format!("{} 个参数", params.len()),
            format!("{} 个参数", args.len()),
        ));
    }

    args.iter()
        .zip(params)
        .enumerate()
        .map(|(index, (arg, param))| coerce(index, param, arg.clone()))
        .collect()
}

/// 单个值按目标类型检查；包装类型与基本类型共用同一值表示
pub(crate) fn coerce(index: usize, ty: &TypeRef, value: Value) -> Result<Value, ReflectError> {
    if ty.accepts(&value) {
        Ok(value)
    } else {
        Err(ReflectError::argument_mismatch(index, ty.to_string(), value.type_name()))
    }
}

/// 字段访问的目标对象必须是声明类的实例
pub(crate) fn check_target(declaring: &ClassDescriptor, target: &ObjectRef) -> Result<(), ReflectError> {
    if target.is_instance_of(declaring.name()) {
        Ok(())
    } else {
        Err(ReflectError::argument_mismatch(
            0,
            declaring.name(),
            target.class().name(),
        ))
    }
}

/// 代理方法的实参装箱，基本类型参数不接受 null
pub(crate) fn box_arguments(params: &[TypeRef], args: &[Value]) -> Result<Vec<Value>, Exception> {
    if params.len() != args.len() {
        return Err(Exception::illegal_argument(format!(
            "参数个数不匹配: 需要 {}，实际 {}",
            params.len(),
            args.len()
        )));
    }

    args.iter()
        .zip(params)
        .map(|(arg, param)| {
            if param.accepts(arg) {
                Ok(arg.clone())
            } else {
                Err(Exception::illegal_argument(format!(
                    "参数类型不匹配: 需要 {param}，实际 {}",
                    arg.type_name()
                )))
            }
        })
        .collect()
}

/// 将处理器返回值转换为方法声明的返回类型
pub(crate) fn convert_return(return_type: &TypeRef, value: Value) -> Result<Value, Exception> {
    match return_type {
        TypeRef::Void => Ok(Value::Null),
        TypeRef::Primitive(primitive) => unbox(*primitive, value),
        ty if ty.accepts(&value) => Ok(value),
        ty => Err(Exception::class_cast(format!(
            "{} 无法转换为 {ty}",
            value.type_name()
        ))),
    }
}

fn unbox(primitive: Primitive, value: Value) -> Result<Value, Exception> {
    match value {
        Value::Null => Err(Exception::null_pointer(format!(
            "处理器为 {} 返回值返回了 null",
            primitive.name()
        ))),
        value if value.primitive() == Some(primitive) => Ok(value),
        value => Err(Exception::class_cast(format!(
            "{} 无法转换为 {}",
            value.type_name(),
            primitive.wrapper_name()
        ))),
    }
}
