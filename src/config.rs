// パス: src/config.rs
// 役割: REPL の設定値（実行エンジン・匿名名の接頭辞・履歴）を保持し JSON から読み込む
// 意図: 既定値・設定ファイル・コマンドライン引数の順で上書きできる単一の設定型を用意する
// 関連ファイル: src/bin/kaleido.rs, src/repl/cmd.rs, src/naming.rs
//! REPL 設定
//!
//! 設定ファイルは JSON。欠けている項目は既定値で埋める。
//!
//! ```json
//! { "engine": "interp", "anon_prefix": "__anon_expr", "history": true }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::naming::DEFAULT_ANON_PREFIX;

/// 履歴ファイルの場所を上書きする環境変数。
pub const HISTORY_ENV: &str = "KALEIDO_HISTORY_FILE";

/// 実行エンジンの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Jit,
    Interp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    pub engine: Engine,
    pub anon_prefix: String,
    /// 履歴を読み書きするかどうか。
    pub history: bool,
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            anon_prefix: DEFAULT_ANON_PREFIX.to_string(),
            history: true,
            history_file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("設定ファイルを開けません: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("設定ファイルの形式が不正です: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReplConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// JSON ファイルから読み込む。
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 実際に使う履歴ファイル。設定値、環境変数、ホームディレクトリの順に探す。
    /// 履歴が無効なら `None`。
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history {
            return None;
        }
        if let Some(path) = &self.history_file {
            return Some(path.clone());
        }
        if let Some(path) = env::var_os(HISTORY_ENV) {
            return Some(PathBuf::from(path));
        }
        env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .map(|home| home.join(".kaleido_repl_history"))
    }
}
