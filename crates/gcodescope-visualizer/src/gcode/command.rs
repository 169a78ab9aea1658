//! Command, layer and locator types

use glam::DVec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One motion or state instruction as emitted by the worker
///
/// Positions are absolute and resolved in file order when the command is
/// created: `prev_*` is where the move starts, `x`/`y`/`z` where it ends.
/// An axis the source line did not mention keeps its previous value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Zero-based source line number
    pub line: usize,
    /// Instruction word (e.g., "G1")
    pub gcode: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub prev_x: f64,
    #[serde(default)]
    pub prev_y: f64,
    #[serde(default)]
    pub prev_z: f64,
    /// Filament fed by this command (negative when retracting)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<f64>,
    /// Modal feed rate in mm/min
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_rate: Option<f64>,
    /// Active tool
    #[serde(default)]
    pub tool: u32,
    /// This segment deposits material
    pub extrude: bool,
    /// This command pulls filament back
    #[serde(default)]
    pub retract: bool,
    /// Bytes consumed through this line as a percentage of the file
    pub percentage: f64,
}

impl Command {
    /// Position before the command
    pub fn start(&self) -> DVec3 {
        DVec3::new(self.prev_x, self.prev_y, self.prev_z)
    }

    /// Position after the command
    pub fn end(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    /// Straight-line length of the move
    pub fn distance(&self) -> f64 {
        self.start().distance(self.end())
    }
}

/// Commands sharing one Z height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Layer number assigned by the worker; survives re-indexing
    pub source_number: usize,
    /// Z height of the layer
    pub z: f64,
    pub commands: Vec<Command>,
}

impl Layer {
    pub fn new(source_number: usize, z: f64, commands: Vec<Command>) -> Self {
        Self {
            source_number,
            z,
            commands,
        }
    }

    /// Whether any command in the layer deposits material
    pub fn has_extrusion(&self) -> bool {
        self.commands.iter().any(|cmd| cmd.extrude)
    }

    pub fn z_key(&self) -> ZKey {
        ZKey::from_z(self.z)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Position of a command inside the processed model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub layer: usize,
    pub cmd: usize,
}

impl Locator {
    pub fn new(layer: usize, cmd: usize) -> Self {
        Self { layer, cmd }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer {} cmd {}", self.layer, self.cmd)
    }
}

/// Z height quantized to whole micrometres
///
/// Used as the stable key for per-layer aggregates. Serialized as the height
/// in millimetres with three decimals so it can key JSON objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZKey(i64);

impl ZKey {
    const STEPS_PER_MM: f64 = 1000.0;

    pub fn from_z(z: f64) -> Self {
        Self((z * Self::STEPS_PER_MM).round() as i64)
    }

    pub fn z(self) -> f64 {
        self.0 as f64 / Self::STEPS_PER_MM
    }
}

impl std::fmt::Display for ZKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.z())
    }
}

impl Serialize for ZKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ZKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.trim()
            .parse::<f64>()
            .map(ZKey::from_z)
            .map_err(serde::de::Error::custom)
    }
}
