//! ドローンシミュレーション設定の正規化ツール
//!
//! ワールドとドローン一覧を記述したJSON/YAML設定を読み込み、
//! ドローンごとのコロン区切りレコードに平坦化します。

pub mod document;
pub mod logging;
pub mod models;
pub mod normalizer;

pub use document::{ConfigDocument, ConfigError, DocumentFormat};
pub use normalizer::{NormalizedConfig, Schema, normalize};
