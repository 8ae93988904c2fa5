//! 错误类型定义

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 应用层异常
///
/// 由构造器、方法体或拦截处理器抛出，原样传递给调用方。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// 异常类型名称
    pub class_name: Arc<str>,
    /// 异常消息
    pub message: Arc<str>,
}

impl Exception {
    /// 创建新的异常
    pub fn new(class_name: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
        }
    }

    /// 非法状态异常
    pub fn illegal_state(message: impl Into<Arc<str>>) -> Self {
        Self::new("IllegalStateException", message)
    }

    /// 非法参数异常
    pub fn illegal_argument(message: impl Into<Arc<str>>) -> Self {
        Self::new("IllegalArgumentException", message)
    }

    /// 类型转换异常
    pub fn class_cast(message: impl Into<Arc<str>>) -> Self {
        Self::new("ClassCastException", message)
    }

    /// 空引用异常
    pub fn null_pointer(message: impl Into<Arc<str>>) -> Self {
        Self::new("NullPointerException", message)
    }

    /// 抽象方法调用异常
    pub fn abstract_method(message: impl Into<Arc<str>>) -> Self {
        Self::new("AbstractMethodError", message)
    }

    /// 方法不存在异常
    pub fn no_such_method(message: impl Into<Arc<str>>) -> Self {
        Self::new("NoSuchMethodError", message)
    }

    /// 是否为指定类型的异常
    pub fn is(&self, class_name: &str) -> bool {
        &*self.class_name == class_name
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.class_name)
        } else {
            write!(f, "{}: {}", self.class_name, self.message)
        }
    }
}

/// 反射消除子系统错误类型
#[derive(Error, Debug, Clone)]
pub enum ReflectError {
    #[error("成员未找到: {owner}.{member}")]
    MemberNotFound { owner: String, member: String },

    #[error("构造器匹配存在歧义: {owner}, 候选数量: {candidates}")]
    AmbiguousConstructor { owner: String, candidates: usize },

    #[error("参数类型不匹配: 索引 {index}, 期望 {expected}, 实际 {actual}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("无效的父类: {type_name} 是接口")]
    InvalidSuperclass { type_name: String },

    #[error("编译失败: {target}, 原因: {reason}")]
    CompilationFailure { target: String, reason: String },

    #[error("类已定义: {name}")]
    DuplicateClass { name: String },

    #[error("类未找到: {name}")]
    ClassNotFound { name: String },

    #[error("类元数据无效: {type_name}, 原因: {message}")]
    InvalidMetadata { type_name: String, message: String },

    #[error("代理处理器已绑定: {type_name}")]
    HandlerAlreadyBound { type_name: String },

    #[error("运行时启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error(transparent)]
    Invocation(#[from] Exception),
}

impl ReflectError {
    /// 创建成员未找到错误
    pub fn member_not_found(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MemberNotFound {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// 创建参数类型不匹配错误
    pub fn argument_mismatch(
        index: usize,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ArgumentTypeMismatch {
            index,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 创建编译失败错误
    pub fn compilation_failure(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CompilationFailure {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// 创建元数据无效错误
    pub fn invalid_metadata(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 获取被透传的应用异常
    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            Self::Invocation(exception) => Some(exception),
            _ => None,
        }
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        #[from]
        source: config::ConfigError,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 结果类型别名
pub type ReflectResult<T> = Result<T, ReflectError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
