//! 调用器编译器
//!
//! 按层级顺序尝试策略，第一个成功者胜出；全部失败时才报告编译失败。

use crate::tiers::{NativeStrategy, ReflectiveStrategy, TypedHandleStrategy};
use infrastructure_common::{InvokerConfig, ReflectError};
use reflect_abstractions::{
    ConstructorInvoker, FieldInvoker, InvokerStrategy, ResolvedConstructor, ResolvedField, TierError,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 调用器编译器
pub struct InvokerCompiler {
    strategies: Vec<Box<dyn InvokerStrategy>>,
}

impl InvokerCompiler {
    /// 使用自定义策略链
    pub fn new(strategies: Vec<Box<dyn InvokerStrategy>>) -> Self {
        Self { strategies }
    }

    /// 按配置构建默认策略链，反射层级始终位于末尾
    pub fn from_config(config: &InvokerConfig) -> Self {
        Self::new(vec![
            Box::new(NativeStrategy::new(config.native_tier)),
            Box::new(TypedHandleStrategy::new(config.handle_tier)),
            Box::new(ReflectiveStrategy),
        ])
    }

    pub fn compile_constructor(
        &self,
        member: &ResolvedConstructor,
    ) -> Result<Arc<dyn ConstructorInvoker>, ReflectError> {
        self.compile_with(member.display_name(), |strategy| strategy.compile_constructor(member))
    }

    pub fn compile_field(&self, member: &ResolvedField) -> Result<Arc<dyn FieldInvoker>, ReflectError> {
        self.compile_with(member.display_name(), |strategy| strategy.compile_field(member))
    }

    fn compile_with<T>(
        &self,
        target: String,
        compile: impl Fn(&dyn InvokerStrategy) -> Result<T, TierError>,
    ) -> Result<T, ReflectError> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            match compile(strategy.as_ref()) {
                Ok(invoker) => {
                    debug!("调用器编译完成: {} [{}]", target, strategy.tier());
                    return Ok(invoker);
                }
                Err(error) if error.is_unavailable() => {
                    debug!("{} 层级不适用于 {}: {}", strategy.tier(), target, error);
                    failures.push(format!("{}: {}", strategy.tier(), error));
                }
                Err(error) => {
                    warn!("{} 层级绑定 {} 失败，回退到下一层级: {}", strategy.tier(), target, error);
                    failures.push(format!("{}: {}", strategy.tier(), error));
                }
            }
        }

        Err(ReflectError::compilation_failure(target, failures.join("; ")))
    }
}

impl std::fmt::Debug for InvokerCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<_> = self.strategies.iter().map(|s| s.tier()).collect();
        f.debug_struct("InvokerCompiler").field("tiers", &tiers).finish()
    }
}
