//! # Normalizer モジュール
//!
//! ワールドとドローン一覧を記述した設定ドキュメントを、ドローン1機につき
//! 1行のコロン区切りレコードへ平坦化します。
//!
//! ## 既定値の扱い
//!
//! 既定値が適用されるのは「キーが存在しない」場合のみです。キーが存在して
//! 型や形状が想定と異なる場合は [`ConfigError::MalformedField`] として
//! 呼び出し元へ伝播し、既定値で黙って置き換えることはしません。
//!
//! ## 出力形式
//!
//! - スキーマA: `model:name:x:y:z:yaw:capacity[:slot:type:x:y:z:roll:pitch:yaw]...`
//! - スキーマB: `model:x:y:z:yaw[:slot:type:x:y:z:roll:pitch:yaw]...`

use crate::document::ConfigError;
use crate::models::{Pose, Position3D, Rotation3D, Scalar};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// 文字列フィールドの既定値
pub const NONE_LITERAL: &str = "none";

/// 想定負荷（W）
const LOAD_WATTS: f64 = 6.6;
/// 想定電圧（V）
const BATTERY_VOLTAGE: f64 = 12.694;

/// 飛行時間（分）からバッテリー容量（Ah）を算出
///
/// 容量 = 飛行時間（時間） × 負荷 / 電圧。電圧は一定と仮定します。
pub fn battery_capacity(flight_time_min: f64) -> f64 {
    (flight_time_min / 60.0) * LOAD_WATTS / BATTERY_VOLTAGE
}

/// ドローンレコードのスキーマ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schema {
    /// `model`, `name`, `pose`, `flight_time`, `payload`
    #[default]
    A,
    /// `model`, `pose`, `sensors`
    B,
}

impl FromStr for Schema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(Schema::A),
            "b" => Ok(Schema::B),
            _ => Err(format!("無効なスキーマ: {}. 利用可能: a, b", s)),
        }
    }
}

impl Schema {
    /// センサー一覧を格納するキー
    pub fn payload_key(self) -> &'static str {
        match self {
            Schema::A => "payload",
            Schema::B => "sensors",
        }
    }

    /// `name` と `capacity` を出力に含むか
    pub fn is_extended(self) -> bool {
        matches!(self, Schema::A)
    }
}

/// 1スロット分のセンサー情報（8フィールド）
#[derive(Debug, Clone, PartialEq)]
pub struct SensorGroup {
    pub slot: String,
    pub sensor_type: String,
    pub position: Position3D,
    pub rotation: Rotation3D,
}

impl fmt::Display for SensorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.slot, self.sensor_type, self.position, self.rotation
        )
    }
}

/// 正規化済みドローンレコード
///
/// `name` と `capacity` はスキーマAの場合のみ `Some` になります。
#[derive(Debug, Clone, PartialEq)]
pub struct DroneRecord {
    pub model: String,
    pub name: Option<String>,
    pub pose: Pose,
    pub capacity: Option<Scalar>,
    pub sensors: Vec<SensorGroup>,
}

impl fmt::Display for DroneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.model)?;
        if let Some(name) = &self.name {
            write!(f, ":{}", name)?;
        }
        write!(f, ":{}", self.pose)?;
        if let Some(capacity) = &self.capacity {
            write!(f, ":{}", capacity)?;
        }
        for sensor in &self.sensors {
            write!(f, ":{}", sensor)?;
        }
        Ok(())
    }
}

/// 正規化結果（ワールド名 + ドローンレコード列）
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConfig {
    pub world: String,
    pub drones: Vec<DroneRecord>,
}

impl NormalizedConfig {
    /// 出力行（1行目がワールド名、以降が入力順のドローン）
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(self.world.clone())
            .chain(self.drones.iter().map(|d| d.to_string()))
            .collect()
    }
}

impl fmt::Display for NormalizedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.world)?;
        for drone in &self.drones {
            writeln!(f, "{}", drone)?;
        }
        Ok(())
    }
}

/// 設定ドキュメント全体を正規化
///
/// `drones` キーが存在しない場合はドローンなしとして扱い、警告を出力します。
pub fn normalize(root: &Value, schema: Schema) -> Result<NormalizedConfig, ConfigError> {
    let doc = as_mapping(root, "document")?;

    let world = optional_string(doc, "world", "world")?;

    let drones = match doc.get("drones") {
        None => {
            warn!("drones キーがありません。ドローンなしとして扱います");
            Vec::new()
        }
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, entry)| normalize_drone(entry, schema, &format!("drones[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ConfigError::malformed("drones", "a sequence of drones")),
    };

    info!(world = %world, drones = drones.len(), ?schema, "設定を正規化しました");

    Ok(NormalizedConfig { world, drones })
}

/// ドローン1機分を正規化
pub fn normalize_drone(entry: &Value, schema: Schema, path: &str) -> Result<DroneRecord, ConfigError> {
    let drone = as_mapping(entry, path)?;

    let model = optional_string(drone, "model", &join(path, "model"))?;
    let name = if schema.is_extended() {
        Some(optional_string(drone, "name", &join(path, "name"))?)
    } else {
        None
    };

    let pose = optional_scalars::<4>(drone, "pose", &join(path, "pose"))?
        .map(Pose::from)
        .unwrap_or_default();

    let capacity = if schema.is_extended() {
        let capacity = match drone.get("flight_time") {
            Some(value) => {
                let minutes = flight_time_minutes(value, &join(path, "flight_time"))?;
                Scalar::Float(battery_capacity(minutes))
            }
            None => Scalar::ZERO,
        };
        Some(capacity)
    } else {
        None
    };

    let payload_key = schema.payload_key();
    let sensors = match drone.get(payload_key) {
        None => Vec::new(),
        Some(value) => {
            let payload_path = join(path, payload_key);
            let slots = as_mapping(value, &payload_path)?;
            let mut sensors = Vec::with_capacity(slots.len());
            for (slot, sensor) in slots {
                if let Some(group) = normalize_sensor(slot, sensor, &join(&payload_path, slot))? {
                    sensors.push(group);
                }
            }
            sensors
        }
    };

    Ok(DroneRecord {
        model,
        name,
        pose,
        capacity,
        sensors,
    })
}

/// センサースロット1つを正規化（センサー種別がなければ `None`）
fn normalize_sensor(slot: &str, entry: &Value, path: &str) -> Result<Option<SensorGroup>, ConfigError> {
    let sensor = as_mapping(entry, path)?;

    let sensor_type = match sensor.get("sensor") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() || s == "None" => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ConfigError::malformed(join(path, "sensor"), "a sensor type string")),
    };
    let Some(sensor_type) = sensor_type else {
        debug!(slot, path, "センサー種別のないスロットをスキップ");
        return Ok(None);
    };

    let position = optional_scalars::<3>(sensor, "position", &join(path, "position"))?
        .map(Position3D::from)
        .unwrap_or_default();
    let rotation = optional_scalars::<3>(sensor, "rotation", &join(path, "rotation"))?
        .map(Rotation3D::from)
        .unwrap_or_default();

    Ok(Some(SensorGroup {
        slot: slot.to_string(),
        sensor_type,
        position,
        rotation,
    }))
}

fn join(path: &str, key: &str) -> String {
    format!("{}.{}", path, key)
}

fn as_mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| ConfigError::malformed(path, "a mapping"))
}

/// 文字列フィールドの取得（キーがなければ `"none"`）
fn optional_string(map: &Map<String, Value>, key: &str, path: &str) -> Result<String, ConfigError> {
    match map.get(key) {
        None => Ok(NONE_LITERAL.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigError::malformed(path, "a string")),
    }
}

fn scalar(value: &Value, path: &str) -> Result<Scalar, ConfigError> {
    match value {
        Value::Number(n) => Ok(Scalar::from_number(n)),
        _ => Err(ConfigError::malformed(path, "a number")),
    }
}

/// 要素数Nの数値列の取得（キーがなければ `None`）
fn optional_scalars<const N: usize>(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<[Scalar; N]>, ConfigError> {
    let items = match map.get(key) {
        None => return Ok(None),
        Some(Value::Array(items)) if items.len() == N => items,
        Some(_) => return Err(ConfigError::malformed(path, format!("a sequence of {} numbers", N))),
    };

    let mut values = [Scalar::ZERO; N];
    for (i, item) in items.iter().enumerate() {
        values[i] = scalar(item, &format!("{}[{}]", path, i))?;
    }
    Ok(Some(values))
}

/// 飛行時間（分）の取得。数値または数値文字列を受け付ける
pub(crate) fn flight_time_minutes(value: &Value, path: &str) -> Result<f64, ConfigError> {
    match value {
        Value::Number(n) => Ok(Scalar::from_number(n).as_f64()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::malformed(path, "a number of minutes")),
        _ => Err(ConfigError::malformed(path, "a number of minutes")),
    }
}
