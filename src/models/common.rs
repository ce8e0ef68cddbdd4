use std::fmt;

use serde_json::Number;

/// 設定ファイル中の数値
///
/// 入力ドキュメントで整数として書かれた値は整数のまま、浮動小数点数として
/// 書かれた値は浮動小数点数のまま出力するため、種別を保持します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i128),
    Float(f64),
}

impl Scalar {
    /// 既定値として使うゼロ（整数）
    pub const ZERO: Scalar = Scalar::Int(0);

    /// JSON数値から変換
    pub fn from_number(number: &Number) -> Self {
        if let Some(v) = number.as_i64() {
            Scalar::Int(v as i128)
        } else if let Some(v) = number.as_u64() {
            Scalar::Int(v as i128)
        } else {
            Scalar::Float(number.as_f64().unwrap_or(f64::NAN))
        }
    }

    /// f64としての値
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Int(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::ZERO
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write_float(f, v),
        }
    }
}

/// 浮動小数点数を最短の往復可能表現で書き出す
///
/// 整数値でも小数部を1桁残し（`1.0`）、絶対値が1e16以上または1e-4未満の
/// 場合は指数表記（`1e+16`, `1e-05`）にします。
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }

    let magnitude = v.abs();
    if v != 0.0 && (magnitude >= 1e16 || magnitude < 1e-4) {
        let repr = format!("{:e}", v);
        return match repr.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;
                let sign = if exponent < 0 { '-' } else { '+' };
                write!(f, "{}e{}{:02}", mantissa, sign, exponent.abs())
            }
            None => f.write_str(&repr),
        };
    }

    if v.fract() == 0.0 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

/// 3次元位置（x, y, z）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3D {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl Position3D {
    pub fn new(x: Scalar, y: Scalar, z: Scalar) -> Self {
        Self { x, y, z }
    }
}

impl From<[Scalar; 3]> for Position3D {
    fn from([x, y, z]: [Scalar; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Position3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.x, self.y, self.z)
    }
}

/// 姿勢角（roll, pitch, yaw）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation3D {
    pub roll: Scalar,
    pub pitch: Scalar,
    pub yaw: Scalar,
}

impl Rotation3D {
    pub fn new(roll: Scalar, pitch: Scalar, yaw: Scalar) -> Self {
        Self { roll, pitch, yaw }
    }
}

impl From<[Scalar; 3]> for Rotation3D {
    fn from([roll, pitch, yaw]: [Scalar; 3]) -> Self {
        Self::new(roll, pitch, yaw)
    }
}

impl fmt::Display for Rotation3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.roll, self.pitch, self.yaw)
    }
}

/// 機体の初期姿勢（位置 + ヨー角）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Position3D,
    pub yaw: Scalar,
}

impl From<[Scalar; 4]> for Pose {
    fn from([x, y, z, yaw]: [Scalar; 4]) -> Self {
        Self {
            position: Position3D::new(x, y, z),
            yaw,
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.position, self.yaw)
    }
}
