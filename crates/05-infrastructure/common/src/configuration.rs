//! 运行时配置
//!
//! 从可选的配置文件（TOML/JSON/YAML）与 `REFLECT__*` 环境变量加载。

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "REFLECT";

/// 运行时配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 调用器编译配置
    pub invoker: InvokerConfig,
    /// 代理类编译配置
    pub proxy: ProxyCompilerConfig,
    /// 原始分配能力
    pub allocation: AllocationConfig,
}

/// 调用器层级开关，反射层始终可用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    pub native_tier: bool,
    pub handle_tier: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            native_tier: true,
            handle_tier: true,
        }
    }
}

/// 代理类编译配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyCompilerConfig {
    /// 生成类名的命名空间
    pub namespace: String,
    /// 调试输出目录，设置后写出生成类描述
    pub dump_dir: Option<PathBuf>,
}

impl Default for ProxyCompilerConfig {
    fn default() -> Self {
        Self {
            namespace: "adsp.proxy".to_string(),
            dump_dir: None,
        }
    }
}

/// 跳过构造器的分配能力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub raw_allocation: bool,
    pub handle_allocation: bool,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            raw_allocation: true,
            handle_allocation: true,
        }
    }
}

impl RuntimeConfig {
    /// 加载配置：默认值 <- 配置文件 <- 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            builder = builder.add_source(config::File::from(path));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        tracing::debug!("运行时配置加载完成: {:?}", config);
        Ok(config)
    }

    /// 仅从环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let namespace = self.proxy.namespace.trim();
        if namespace.is_empty() || namespace.starts_with('.') || namespace.ends_with('.') {
            return Err(ConfigError::ValidationError {
                message: format!("代理命名空间无效: '{}'", self.proxy.namespace),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_enable_every_tier() {
        let config = RuntimeConfig::default();
        assert!(config.invoker.native_tier);
        assert!(config.invoker.handle_tier);
        assert!(config.allocation.raw_allocation);
        assert_eq!(config.proxy.namespace, "adsp.proxy");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[invoker]\nhandle_tier = false\n\n[proxy]\nnamespace = \"test.proxies\"\n\n[allocation]\nraw_allocation = false"
        )
        .unwrap();

        let config = RuntimeConfig::load(Some(file.path())).unwrap();
        assert!(!config.invoker.handle_tier);
        assert!(config.invoker.native_tier);
        assert_eq!(config.proxy.namespace, "test.proxies");
        assert!(!config.allocation.raw_allocation);
        assert!(config.allocation.handle_allocation);
    }

    #[test]
    fn load_rejects_missing_file() {
        let result = RuntimeConfig::load(Some(Path::new("/nonexistent/reflect.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn validate_rejects_blank_namespace() {
        let mut config = RuntimeConfig::default();
        config.proxy.namespace = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
