//! 生成类的调试输出
//!
//! 配置 `proxy.dump_dir` 后，每个新生成的代理类写出一份 JSON 描述。写出失败只记录日志。

use anyhow::Context;
use chrono::{DateTime, Utc};
use infrastructure_common::{format_params, MethodDescriptor};
use reflect_abstractions::ProxyClass;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ClassDump<'a> {
    name: &'a str,
    superclass: Option<&'a str>,
    interfaces: Vec<&'a str>,
    call_super_constructor: bool,
    constructors: Vec<String>,
    methods: Vec<MethodDump>,
    generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct MethodDump {
    name: String,
    signature: String,
    return_type: String,
    exceptions: Vec<String>,
}

impl From<&MethodDescriptor> for MethodDump {
    fn from(method: &MethodDescriptor) -> Self {
        Self {
            name: method.name.to_string(),
            signature: format_params(&method.params),
            return_type: method.return_type.to_string(),
            exceptions: method.exceptions.iter().map(ToString::to_string).collect(),
        }
    }
}

/// 生成类转储器
#[derive(Debug, Clone)]
pub struct ClassDumper {
    dir: PathBuf,
}

impl ClassDumper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 指定类名对应的转储文件路径
    pub fn path_for(&self, class_name: &str) -> PathBuf {
        self.dir.join(format!("{class_name}.json"))
    }

    /// 写出代理类描述；失败时记录警告并继续
    pub fn dump(&self, proxy: &ProxyClass) {
        match self.try_dump(proxy) {
            Ok(path) => debug!("生成类已转储: {}", path.display()),
            Err(error) => warn!("生成类转储失败 {}: {:#}", proxy.name(), error),
        }
    }

    fn try_dump(&self, proxy: &ProxyClass) -> anyhow::Result<PathBuf> {
        let class = proxy.class();
        let dump = ClassDump {
            name: class.name(),
            superclass: class.superclass().map(|superclass| superclass.name()),
            interfaces: class.interfaces().iter().map(|i| i.name()).collect(),
            call_super_constructor: proxy.call_super_constructor(),
            constructors: class.constructors().iter().map(|c| c.signature()).collect(),
            methods: class.methods().iter().map(MethodDump::from).collect(),
            generated_at: Utc::now(),
        };

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("无法创建转储目录 {}", self.dir.display()))?;
        let path = self.path_for(class.name());
        let json = serde_json::to_vec_pretty(&dump).context("序列化生成类描述失败")?;
        fs::write(&path, json).with_context(|| format!("无法写入 {}", path.display()))?;
        Ok(path)
    }
}
