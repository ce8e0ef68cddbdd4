//! センサー種別ごとのブリッジ定義テーブル
//!
//! シミュレータとミドルウェア間で開設されるブリッジを、センサー種別の
//! 文字列から固定のブリッジ記述子リストへ対応付けます。
//! ここで扱うのは記述子のみで、実際の通信は行いません。

use std::fmt;

const CAMERA_MODELS: &[&str] = &["vga_camera", "hd_camera", "semantic_camera"];
const RGBD_MODELS: &[&str] = &["rgbd_camera"];
const LIDAR_MODELS: &[&str] = &["planar_lidar", "3d_lidar", "point_lidar"];
const GPS_MODELS: &[&str] = &["gps"];
const SUCTION_GRIPPER_MODELS: &[&str] = &["suction_gripper"];

/// センサー種別の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFamily {
    Camera,
    Rgbd,
    Lidar,
    Gps,
    SuctionGripper,
}

impl SensorFamily {
    pub const ALL: [SensorFamily; 5] = [
        SensorFamily::Camera,
        SensorFamily::Rgbd,
        SensorFamily::Lidar,
        SensorFamily::Gps,
        SensorFamily::SuctionGripper,
    ];

    /// この分類に属するセンサー種別
    pub fn sensor_types(self) -> &'static [&'static str] {
        match self {
            SensorFamily::Camera => CAMERA_MODELS,
            SensorFamily::Rgbd => RGBD_MODELS,
            SensorFamily::Lidar => LIDAR_MODELS,
            SensorFamily::Gps => GPS_MODELS,
            SensorFamily::SuctionGripper => SUCTION_GRIPPER_MODELS,
        }
    }

    /// センサー種別文字列から分類を決定（未知の種別は `None`）
    pub fn from_sensor_type(sensor_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.sensor_types().contains(&sensor_type))
    }

    /// この分類のセンサーに開設するブリッジ
    pub fn bridge_kinds(self) -> Vec<BridgeKind> {
        match self {
            SensorFamily::Camera => vec![BridgeKind::Image, BridgeKind::CameraInfo],
            SensorFamily::Lidar => vec![BridgeKind::LidarScan, BridgeKind::LidarPoints],
            SensorFamily::Rgbd => vec![
                BridgeKind::Image,
                BridgeKind::CameraInfo,
                BridgeKind::DepthImage,
                BridgeKind::CameraPoints,
            ],
            SensorFamily::Gps => vec![BridgeKind::NavSat],
            SensorFamily::SuctionGripper => std::iter::once(BridgeKind::GripperSuctionControl)
                .chain(GripperSide::ALL.into_iter().map(BridgeKind::GripperContact))
                .collect(),
        }
    }
}

/// 吸着グリッパーの接触センサー位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperSide {
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

impl GripperSide {
    pub const ALL: [GripperSide; 5] = [
        GripperSide::Center,
        GripperSide::Left,
        GripperSide::Right,
        GripperSide::Top,
        GripperSide::Bottom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GripperSide::Center => "center",
            GripperSide::Left => "left",
            GripperSide::Right => "right",
            GripperSide::Top => "top",
            GripperSide::Bottom => "bottom",
        }
    }
}

/// ブリッジの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeKind {
    Imu,
    Magnetometer,
    AirPressure,
    Pose,
    PoseStatic,
    CmdVel,
    Arm,
    Image,
    CameraInfo,
    DepthImage,
    CameraPoints,
    LidarScan,
    LidarPoints,
    NavSat,
    GripperSuctionControl,
    GripperContact(GripperSide),
}

impl BridgeKind {
    pub fn name(self) -> &'static str {
        match self {
            BridgeKind::Imu => "imu",
            BridgeKind::Magnetometer => "magnetometer",
            BridgeKind::AirPressure => "air_pressure",
            BridgeKind::Pose => "pose",
            BridgeKind::PoseStatic => "pose_static",
            BridgeKind::CmdVel => "cmd_vel",
            BridgeKind::Arm => "arm",
            BridgeKind::Image => "image",
            BridgeKind::CameraInfo => "camera_info",
            BridgeKind::DepthImage => "depth_image",
            BridgeKind::CameraPoints => "camera_points",
            BridgeKind::LidarScan => "lidar_scan",
            BridgeKind::LidarPoints => "lidar_points",
            BridgeKind::NavSat => "navsat",
            BridgeKind::GripperSuctionControl => "gripper_suction_control",
            BridgeKind::GripperContact(_) => "gripper_contact",
        }
    }

    /// ワールド名を必要とするか
    pub fn is_world_scoped(self) -> bool {
        !matches!(
            self,
            BridgeKind::Pose
                | BridgeKind::PoseStatic
                | BridgeKind::CmdVel
                | BridgeKind::Arm
                | BridgeKind::GripperSuctionControl
                | BridgeKind::GripperContact(_)
        )
    }
}

/// ブリッジ記述子
#[derive(Debug, Clone, PartialEq)]
pub struct Bridge {
    pub kind: BridgeKind,
    pub world_name: Option<String>,
    pub model_name: String,
    pub sensor_name: Option<String>,
    pub model_prefix: Option<String>,
}

impl Bridge {
    /// 機体そのものに対するブリッジ
    pub fn vehicle(kind: BridgeKind, world_name: &str, model_name: &str) -> Self {
        Self {
            kind,
            world_name: kind.is_world_scoped().then(|| world_name.to_string()),
            model_name: model_name.to_string(),
            sensor_name: None,
            model_prefix: None,
        }
    }

    /// 搭載センサーに対するブリッジ
    pub fn sensor(
        kind: BridgeKind,
        world_name: &str,
        model_name: &str,
        sensor_name: &str,
        model_prefix: &str,
    ) -> Self {
        if !kind.is_world_scoped() {
            return Self::vehicle(kind, world_name, model_name);
        }
        Self {
            kind,
            world_name: Some(world_name.to_string()),
            model_name: model_name.to_string(),
            sensor_name: Some(sensor_name.to_string()),
            model_prefix: Some(model_prefix.to_string()),
        }
    }
}

impl fmt::Display for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        if let BridgeKind::GripperContact(side) = self.kind {
            write!(f, "[{}]", side.as_str())?;
        }
        write!(f, " model={}", self.model_name)?;
        if let Some(world) = &self.world_name {
            write!(f, " world={}", world)?;
        }
        if let Some(sensor) = &self.sensor_name {
            write!(f, " sensor={}", sensor)?;
        }
        if let Some(prefix) = self.model_prefix.as_ref().filter(|p| !p.is_empty()) {
            write!(f, " prefix={}", prefix)?;
        }
        Ok(())
    }
}

/// 機体本体に常に開設するブリッジ
pub const VEHICLE_BRIDGES: [BridgeKind; 7] = [
    BridgeKind::Imu,
    BridgeKind::Magnetometer,
    BridgeKind::AirPressure,
    BridgeKind::Pose,
    BridgeKind::PoseStatic,
    BridgeKind::CmdVel,
    BridgeKind::Arm,
];

/// センサー種別に応じたブリッジ一覧（未知の種別は空）
pub fn sensor_bridges(
    world_name: &str,
    model_name: &str,
    sensor_type: &str,
    sensor_name: &str,
    model_prefix: &str,
) -> Vec<Bridge> {
    SensorFamily::from_sensor_type(sensor_type)
        .map(|family| {
            family
                .bridge_kinds()
                .into_iter()
                .map(|kind| Bridge::sensor(kind, world_name, model_name, sensor_name, model_prefix))
                .collect()
        })
        .unwrap_or_default()
}
