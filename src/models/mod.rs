// 数値・位置・姿勢の基本データ型
pub mod common;

// センサー種別ごとのブリッジ定義
pub mod bridges;

// 機体モデルの読み込み
pub mod model;

// 便利な re-export
pub use common::*;
pub use bridges::{Bridge, BridgeKind, GripperSide, SensorFamily, sensor_bridges};
pub use model::{Model, PayloadEntry};
