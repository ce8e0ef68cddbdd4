use crate::document::{ConfigDocument, ConfigError, DocumentFormat};
use crate::models::bridges::{Bridge, VEHICLE_BRIDGES, sensor_bridges};
use crate::normalizer::{battery_capacity, flight_time_minutes};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// ペイロードの1スロット
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PayloadEntry {
    #[serde(default)]
    pub sensor: Option<String>,
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
}

impl PayloadEntry {
    /// センサーが実際に搭載されているか（空文字列や `"None"` は未搭載）
    pub fn mounted_sensor(&self) -> Option<&str> {
        self.sensor
            .as_deref()
            .filter(|s| !s.is_empty() && *s != "None")
    }
}

/// シミュレーション上の機体モデル
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub model_name: String,
    pub model_type: String,
    /// x, y, z, roll, pitch, yaw
    pub position: [f64; 6],
    /// バッテリー容量（Ah）
    pub battery_capacity: f64,
    /// スロット名とペイロード（記述順）
    pub payload: Vec<(String, PayloadEntry)>,
}

/// YAMLのモデル位置指定
#[derive(Debug, Default, Deserialize)]
struct PositionConfig {
    #[serde(default)]
    xyz: [f64; 3],
    #[serde(default)]
    rpy: [f64; 3],
}

/// YAML形式のモデル定義
#[derive(Debug, Deserialize)]
struct YamlModelConfig {
    model_name: Option<String>,
    model_type: Option<String>,
    position: Option<PositionConfig>,
    flight_time: Option<Value>,
    payload: Option<Map<String, Value>>,
}

/// JSON形式（`drones` 配列）のモデル定義
#[derive(Debug, Deserialize)]
struct JsonModelConfig {
    model: Option<String>,
    name: Option<String>,
    #[serde(default)]
    xyz: [f64; 3],
    #[serde(default)]
    rpy: [f64; 3],
    flight_time: Option<Value>,
    payload: Option<Map<String, Value>>,
}

impl Model {
    pub fn new(model_name: String, model_type: String, position: [f64; 6]) -> Self {
        Self {
            model_name,
            model_type,
            position,
            battery_capacity: 0.0,
            payload: Vec::new(),
        }
    }

    /// 飛行時間（分）からバッテリー容量を設定
    pub fn set_flight_time(&mut self, flight_time_min: f64) {
        self.battery_capacity = battery_capacity(flight_time_min);
    }

    pub fn set_payload(&mut self, payload: Vec<(String, PayloadEntry)>) {
        self.payload = payload;
    }

    /// ファイルからモデル一覧を読み込み
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        format: Option<DocumentFormat>,
    ) -> Result<Vec<Self>, ConfigError> {
        let document = ConfigDocument::from_file(path, format)?;
        Self::from_document(&document.root, document.format)
    }

    /// 解析済みドキュメントからモデル一覧を構築
    ///
    /// YAMLはトップレベルがリストなら複数、マッピングなら1機。
    /// JSONは `drones` 配列の各要素を1機として扱います。
    pub fn from_document(root: &Value, format: DocumentFormat) -> Result<Vec<Self>, ConfigError> {
        let models = match format {
            DocumentFormat::Yaml => match root {
                Value::Array(entries) => entries
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| Self::from_yaml_entry(entry, &format!("[{}]", i)))
                    .collect::<Result<Vec<_>, _>>()?,
                Value::Object(_) => vec![Self::from_yaml_entry(root, "model")?],
                _ => {
                    return Err(ConfigError::InvalidModel(
                        "model configuration must be a list or a mapping".to_string(),
                    ));
                }
            },
            DocumentFormat::Json => {
                let doc = root
                    .as_object()
                    .ok_or_else(|| ConfigError::malformed("document", "a mapping"))?;
                match doc.get("drones") {
                    None => {
                        return Err(ConfigError::InvalidModel(
                            "Cannot construct models without drones in config".to_string(),
                        ));
                    }
                    Some(Value::Array(entries)) => entries
                        .iter()
                        .enumerate()
                        .map(|(i, entry)| Self::from_json_entry(entry, &format!("drones[{}]", i)))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => return Err(ConfigError::malformed("drones", "a sequence of drones")),
                }
            }
        };

        debug!(count = models.len(), %format, "モデル定義を読み込みました");
        Ok(models)
    }

    fn from_yaml_entry(entry: &Value, path: &str) -> Result<Self, ConfigError> {
        let config: YamlModelConfig = deserialize(entry.clone(), path)?;

        let model_name = config.model_name.ok_or_else(|| {
            ConfigError::InvalidModel("Cannot construct model without model_name in config".to_string())
        })?;
        let model_type = config.model_type.ok_or_else(|| {
            ConfigError::InvalidModel("Cannot construct model without model_type in config".to_string())
        })?;

        let position = config.position.unwrap_or_else(|| {
            warn!(model = %model_name, "position がありません。(0, 0, 0), (0, 0, 0) を使用します");
            PositionConfig::default()
        });

        let mut model = Self::new(model_name, model_type, join_pose(position.xyz, position.rpy));
        if let Some(flight_time) = &config.flight_time {
            model.set_flight_time(flight_time_minutes(flight_time, &format!("{}.flight_time", path))?);
        }
        if let Some(payload) = config.payload {
            model.set_payload(payload_entries(payload, &format!("{}.payload", path))?);
        }
        Ok(model)
    }

    fn from_json_entry(entry: &Value, path: &str) -> Result<Self, ConfigError> {
        let config: JsonModelConfig = deserialize(entry.clone(), path)?;

        let model_type = config.model.ok_or_else(|| {
            ConfigError::InvalidModel("Cannot construct model without model in config".to_string())
        })?;
        let model_name = config.name.ok_or_else(|| {
            ConfigError::InvalidModel("Cannot construct model without name in config".to_string())
        })?;

        let mut model = Self::new(model_name, model_type, join_pose(config.xyz, config.rpy));
        if let Some(flight_time) = &config.flight_time {
            model.set_flight_time(flight_time_minutes(flight_time, &format!("{}.flight_time", path))?);
        }
        if let Some(payload) = config.payload {
            model.set_payload(payload_entries(payload, &format!("{}.payload", path))?);
        }
        Ok(model)
    }

    /// 機体に開設する全ブリッジ（機体本体 + ペイロード）
    pub fn bridges(&self, world_name: &str) -> Vec<Bridge> {
        let mut bridges: Vec<Bridge> = VEHICLE_BRIDGES
            .into_iter()
            .map(|kind| Bridge::vehicle(kind, world_name, &self.model_name))
            .collect();
        bridges.extend(self.payload_bridges(world_name));
        bridges
    }

    /// ペイロードに対するブリッジ（センサー未搭載のスロットは除外）
    pub fn payload_bridges(&self, world_name: &str) -> Vec<Bridge> {
        self.payload
            .iter()
            .filter_map(|(slot, entry)| entry.mounted_sensor().map(|sensor| (slot, sensor)))
            .flat_map(|(slot, sensor)| sensor_bridges(world_name, &self.model_name, sensor, slot, slot))
            .collect()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.model_name, self.model_type)
    }
}

fn join_pose(xyz: [f64; 3], rpy: [f64; 3]) -> [f64; 6] {
    [xyz[0], xyz[1], xyz[2], rpy[0], rpy[1], rpy[2]]
}

fn payload_entries(
    payload: Map<String, Value>,
    path: &str,
) -> Result<Vec<(String, PayloadEntry)>, ConfigError> {
    payload
        .into_iter()
        .map(|(slot, value)| {
            let entry = deserialize(value, &format!("{}.{}", path, slot))?;
            Ok((slot, entry))
        })
        .collect::<Result<Vec<_>, ConfigError>>()
}

/// 型・形状の不一致はフィールドパス付きの MalformedField として返す
fn deserialize<T: serde::de::DeserializeOwned>(value: Value, path: &str) -> Result<T, ConfigError> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let field = e.path().to_string();
        let path = if field == "." {
            path.to_string()
        } else {
            format!("{}.{}", path, field)
        };
        ConfigError::malformed(path, e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bridges::BridgeKind;
    use serde_json::json;

    #[test]
    fn test_yaml_list() {
        let root = DocumentFormat::Yaml
            .parse(
                r#"
- model_name: uav_1
  model_type: hexrotor
  position:
    xyz: [1.0, 2.0, 3.0]
    rpy: [0.0, 0.0, 1.57]
  flight_time: 60
  payload:
    slot0:
      sensor: hd_camera
    slot1:
      sensor: None
- model_name: uav_2
  model_type: quadrotor
"#,
            )
            .unwrap();

        let models = Model::from_document(&root, DocumentFormat::Yaml).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].to_string(), "uav_1[hexrotor]");
        assert_eq!(models[0].position, [1.0, 2.0, 3.0, 0.0, 0.0, 1.57]);
        assert!((models[0].battery_capacity - 6.6 / 12.694).abs() < 1e-12);
        assert_eq!(models[0].payload.len(), 2);
        assert_eq!(models[0].payload[0].0, "slot0");

        assert_eq!(models[1].position, [0.0; 6]);
        assert_eq!(models[1].battery_capacity, 0.0);
        assert!(models[1].payload.is_empty());
    }

    #[test]
    fn test_yaml_single_mapping() {
        let root = DocumentFormat::Yaml
            .parse("model_name: usv\nmodel_type: quadrotor\nposition:\n  xyz: [5, 6, 7]\n")
            .unwrap();
        let models = Model::from_document(&root, DocumentFormat::Yaml).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].position, [5.0, 6.0, 7.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_yaml_requires_name_and_type() {
        let root = json!({"model_type": "hexrotor"});
        assert!(matches!(
            Model::from_document(&root, DocumentFormat::Yaml),
            Err(ConfigError::InvalidModel(msg)) if msg.contains("model_name")
        ));

        let root = json!([{"model_name": "uav"}]);
        assert!(matches!(
            Model::from_document(&root, DocumentFormat::Yaml),
            Err(ConfigError::InvalidModel(msg)) if msg.contains("model_type")
        ));

        assert!(Model::from_document(&json!("uav"), DocumentFormat::Yaml).is_err());
    }

    #[test]
    fn test_json_drones() {
        let root = json!({
            "world": "w",
            "drones": [{
                "model": "quadrotor_base",
                "name": "drone0",
                "xyz": [1, 0, 0.2],
                "flight_time": 30,
                "payload": {"gps0": {"sensor": "gps"}, "cam": {"sensor": "rgbd_camera"}}
            }]
        });
        let models = Model::from_document(&root, DocumentFormat::Json).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].model_name, "drone0");
        assert_eq!(models[0].model_type, "quadrotor_base");
        assert_eq!(models[0].position, [1.0, 0.0, 0.2, 0.0, 0.0, 0.0]);
        assert!((models[0].battery_capacity - battery_capacity(30.0)).abs() < 1e-12);
    }

    #[test]
    fn test_json_requires_model_and_name() {
        let root = json!({"drones": [{"model": "quadrotor_base"}]});
        assert!(matches!(
            Model::from_document(&root, DocumentFormat::Json),
            Err(ConfigError::InvalidModel(msg)) if msg.contains("name")
        ));
        assert!(Model::from_document(&json!({"world": "w"}), DocumentFormat::Json).is_err());
    }

    #[test]
    fn test_bridges() {
        let mut model = Model::new("drone0".to_string(), "quadrotor".to_string(), [0.0; 6]);
        model.set_payload(vec![
            ("front".to_string(), PayloadEntry { sensor: Some("hd_camera".to_string()), ..Default::default() }),
            ("empty".to_string(), PayloadEntry { sensor: Some(String::new()), ..Default::default() }),
            ("none".to_string(), PayloadEntry { sensor: Some("None".to_string()), ..Default::default() }),
            ("gps".to_string(), PayloadEntry { sensor: Some("gps".to_string()), ..Default::default() }),
        ]);

        let bridges = model.bridges("w");
        assert_eq!(bridges.len(), VEHICLE_BRIDGES.len() + 3);
        assert_eq!(bridges[0].kind, BridgeKind::Imu);
        assert_eq!(bridges[0].world_name.as_deref(), Some("w"));
        assert_eq!(bridges[3].kind, BridgeKind::Pose);
        assert_eq!(bridges[3].world_name, None);

        let payload: Vec<BridgeKind> = model.payload_bridges("w").iter().map(|b| b.kind).collect();
        assert_eq!(payload, [BridgeKind::Image, BridgeKind::CameraInfo, BridgeKind::NavSat]);
    }

    #[test]
    fn test_flight_time_accepts_numeric_string() {
        let root = json!({"drones": [{"model": "quadrotor", "name": "d0", "flight_time": "30"}]});
        let models = Model::from_document(&root, DocumentFormat::Json).unwrap();
        assert!((models[0].battery_capacity - battery_capacity(30.0)).abs() < 1e-12);

        let root = json!([{"model_name": "uav", "model_type": "hexrotor", "flight_time": " 60 "}]);
        let models = Model::from_document(&root, DocumentFormat::Yaml).unwrap();
        assert!((models[0].battery_capacity - battery_capacity(60.0)).abs() < 1e-12);

        let root = json!({"drones": [{"model": "quadrotor", "name": "d0", "flight_time": "soon"}]});
        match Model::from_document(&root, DocumentFormat::Json) {
            Err(ConfigError::MalformedField { path, .. }) => assert_eq!(path, "drones[0].flight_time"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_malformed_field() {
        let root = json!({"drones": [{"model": "quadrotor", "name": "d0", "xyz": "1 2 3"}]});
        match Model::from_document(&root, DocumentFormat::Json) {
            Err(ConfigError::MalformedField { path, .. }) => assert_eq!(path, "drones[0].xyz"),
            other => panic!("unexpected result: {:?}", other),
        }

        let root = json!({"drones": [{"model": "quadrotor", "name": "d0", "payload": []}]});
        match Model::from_document(&root, DocumentFormat::Json) {
            Err(ConfigError::MalformedField { path, .. }) => assert_eq!(path, "drones[0].payload"),
            other => panic!("unexpected result: {:?}", other),
        }

        let root = json!([{"model_name": "uav", "model_type": "hexrotor", "payload": {"cam": {"sensor": 3}}}]);
        match Model::from_document(&root, DocumentFormat::Yaml) {
            Err(ConfigError::MalformedField { path, .. }) => assert_eq!(path, "[0].payload.cam.sensor"),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            Model::from_document(&json!({"drones": {"model": "m"}}), DocumentFormat::Json),
            Err(ConfigError::MalformedField { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("models.yaml");
        std::fs::write(
            &yaml_path,
            "- model_name: uav_1\n  model_type: hexrotor\n  payload: {slot0: {sensor: hd_camera}}\n\
             - model_name: uav_2\n  model_type: quadrotor\n  position: {xyz: [1, 2, 3]}\n",
        )
        .unwrap();
        let models = Model::from_file(&yaml_path, None).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].to_string(), "uav_1[hexrotor]");
        assert_eq!(models[0].payload[0].1.mounted_sensor(), Some("hd_camera"));
        assert_eq!(models[1].position, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);

        let json_path = dir.path().join("sim.json");
        std::fs::write(
            &json_path,
            r#"{"world": "w", "drones": [{"model": "quadrotor", "name": "d0", "rpy": [0, 0, 1.5]}]}"#,
        )
        .unwrap();
        let models = Model::from_file(&json_path, None).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].to_string(), "d0[quadrotor]");
        assert_eq!(models[0].position, [0.0, 0.0, 0.0, 0.0, 0.0, 1.5]);

        assert!(matches!(
            Model::from_file(dir.path().join("absent.yaml"), None),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
