//! 层级策略抽象接口
//!
//! 每个层级是一个工厂，按顺序尝试，第一个成功者胜出。

use crate::invoker::{ConstructorInvoker, FieldInvoker, Tier};
use crate::resolver::{ResolvedConstructor, ResolvedField};
use infrastructure_common::{ClassDescriptor, ObjectRef};
use std::sync::Arc;
use thiserror::Error;

/// 层级内部错误，只在编译器内部出现并被回退处理
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("层级已禁用: {tier}")]
    Disabled { tier: Tier },

    #[error("成员不可访问: {member}")]
    Inaccessible { member: String },

    #[error("无法为 final 字段绑定写句柄: {member}")]
    FinalField { member: String },

    #[error("缺少原生入口: {member}")]
    NoNativeEntry { member: String },

    #[error("运行时能力不可用: {capability}")]
    Unsupported { capability: String },
}

impl TierError {
    /// 层级本身不适用（而非绑定失败）
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Disabled { .. } | Self::NoNativeEntry { .. } | Self::Unsupported { .. }
        )
    }
}

/// 调用器层级策略
pub trait InvokerStrategy: Send + Sync {
    /// 策略对应的层级
    fn tier(&self) -> Tier;

    /// 为构造器构建调用器
    fn compile_constructor(
        &self,
        member: &ResolvedConstructor,
    ) -> Result<Arc<dyn ConstructorInvoker>, TierError>;

    /// 为字段构建调用器
    fn compile_field(&self, member: &ResolvedField) -> Result<Arc<dyn FieldInvoker>, TierError>;
}

/// 跳过构造器的原始分配层级
pub trait RawAllocator: Send + Sync {
    /// 层级名称
    fn name(&self) -> &'static str;

    /// 分配实例，所有字段为默认值
    fn allocate(&self, class: &Arc<ClassDescriptor>) -> Result<ObjectRef, TierError>;
}
