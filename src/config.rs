use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::Result;
use crate::http::TransportOptions;

/// 默认数据目录（项目本地）
const DEFAULT_DATA_DIR: &str = ".postcode";
const STORE_FILE: &str = "store.json";
const VAULT_FILE: &str = "vault.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 配置文件内容，所有字段可选
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    vault_path: Option<PathBuf>,
    strict_ssl: Option<bool>,
    timeout_secs: Option<u64>,
}

/// 运行配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 集合与请求所在目录
    pub data_dir: PathBuf,
    /// 凭据库文件，始终与主存储分开
    pub vault_path: PathBuf,
    pub strict_ssl: bool,
    /// 0 表示不设超时
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            vault_path: data_dir.join(VAULT_FILE),
            data_dir,
            strict_ssl: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    pub fn transport(&self) -> TransportOptions {
        TransportOptions {
            strict_ssl: self.strict_ssl,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }

    fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        let data_dir = file.data_dir.unwrap_or(defaults.data_dir);
        Self {
            vault_path: file.vault_path.unwrap_or_else(|| data_dir.join(VAULT_FILE)),
            data_dir,
            strict_ssl: file.strict_ssl.unwrap_or(defaults.strict_ssl),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }

    /// 环境变量覆盖：POSTCODE_DATA_DIR、POSTCODE_VAULT_PATH
    fn apply_env(mut self, data_dir: Option<String>, vault_path: Option<String>) -> Self {
        if let Some(dir) = data_dir {
            let dir = PathBuf::from(dir);
            // 未单独指定凭据库时跟随数据目录
            if self.vault_path == self.data_dir.join(VAULT_FILE) {
                self.vault_path = dir.join(VAULT_FILE);
            }
            self.data_dir = dir;
        }
        if let Some(path) = vault_path {
            self.vault_path = PathBuf::from(path);
        }
        self
    }
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "postcode.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = fs::read_to_string(path.as_ref())?;
        let file: ConfigFile = toml::from_str(&content)?;
        Ok(Config::from_file(file))
    }

    /// 查找并加载配置，再应用环境变量覆盖
    /// 查找顺序：
    /// 1. 当前目录及父目录
    /// 2. 用户配置目录 ~/.config/postcode/
    /// 3. 默认值
    pub fn load() -> Result<Config> {
        let config = match Self::find_config_file() {
            Some(path) => {
                debug!(path = %path.display(), "Loading config");
                Self::load_from_path(path)?
            }
            None => Config::default(),
        };

        Ok(config.apply_env(
            std::env::var("POSTCODE_DATA_DIR").ok(),
            std::env::var("POSTCODE_VAULT_PATH").ok(),
        ))
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::find_in_current_dir().or_else(Self::find_in_user_dir)
    }

    /// 从当前目录向上查找
    fn find_in_current_dir() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            // 尝试父目录
            if !current.pop() {
                break;
            }
        }

        None
    }

    fn find_in_user_dir() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("postcode").join(Self::CONFIG_FILE);
        config_path.exists().then_some(config_path)
    }
}
