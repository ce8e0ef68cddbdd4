//! # Document モジュール
//!
//! シミュレーション設定ファイル（JSONまたはYAML）を読み込み、
//! 形式に依存しない順序保持ツリー（`serde_json::Value`）に変換します。
//!
//! マッピングのキー順序はファイル上の記述順のまま保持されるため、
//! ペイロードのスロットは記述順に処理されます。

use serde_json::Value;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// 入力ドキュメントの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            _ => Err(format!("無効な形式: {}. 利用可能: json, yaml", s)),
        }
    }
}

impl DocumentFormat {
    /// 拡張子から形式を推定（`yaml`/`yml` 以外はJSONとして扱う）
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }

    /// 文字列を解析
    pub fn parse(self, text: &str) -> Result<Value, ParseFailure> {
        match self {
            DocumentFormat::Json => serde_json::from_str(text).map_err(ParseFailure::Json),
            DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(ParseFailure::Yaml),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => f.write_str("json"),
            DocumentFormat::Yaml => f.write_str("yaml"),
        }
    }
}

/// 読み込み済みの設定ドキュメント
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub root: Value,
}

impl ConfigDocument {
    /// ファイルから設定ドキュメントを読み込み
    ///
    /// `format` が `None` の場合は拡張子から形式を決定します。
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        format: Option<DocumentFormat>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = format.unwrap_or_else(|| DocumentFormat::from_path(path));

        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::IoError(path.to_path_buf(), e),
        })?;

        let root = format
            .parse(&contents)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;

        debug!(path = %path.display(), %format, "設定ドキュメント読み込み完了");

        Ok(Self {
            path: path.to_path_buf(),
            format,
            root,
        })
    }
}

/// 構文解析エラー
#[derive(Debug)]
pub enum ParseFailure {
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Json(err) => write!(f, "JSON解析エラー: {}", err),
            ParseFailure::Yaml(err) => write!(f, "YAML解析エラー: {}", err),
        }
    }
}

/// 設定読み込み・正規化エラー
#[derive(Debug)]
pub enum ConfigError {
    FileNotFound(PathBuf),
    IoError(PathBuf, io::Error),
    ParseError(PathBuf, ParseFailure),
    /// キーは存在するが型・形状が想定と異なる
    MalformedField { path: String, expected: String },
    /// モデル定義の必須項目が欠けている
    InvalidModel(String),
}

impl ConfigError {
    pub fn malformed(path: impl Into<String>, expected: impl Into<String>) -> Self {
        ConfigError::MalformedField {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "ファイルが見つかりません (file not found): {}", path.display())
            }
            ConfigError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "{} の解析に失敗: {}", path.display(), err)
            }
            ConfigError::MalformedField { path, expected } => {
                write!(f, "不正なフィールド {}: {} が必要です", path, expected)
            }
            ConfigError::InvalidModel(msg) => {
                write!(f, "モデル定義エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(_, err) => Some(err),
            ConfigError::ParseError(_, ParseFailure::Json(err)) => Some(err),
            ConfigError::ParseError(_, ParseFailure::Yaml(err)) => Some(err),
            _ => None,
        }
    }
}
