//! Worker message protocol
//!
//! Messages are adjacently tagged (`cmd` / `msg`) and the tag strings are the
//! wire contract shared with any worker implementation.

use gcodescope_settings::{BedSettings, ReaderOptions, ToolOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gcode::{Command, GcodeLine};
use crate::model::ModelInfo;

/// Options the worker applies while tokenizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    pub first_report: usize,
    pub tool_offsets: Vec<ToolOffset>,
    pub bed: BedSettings,
    pub ignore_outside_bed: bool,
    pub g90_influences_extruder: bool,
    pub bed_z: f64,
}

impl From<&ReaderOptions> for ParseOptions {
    fn from(reader: &ReaderOptions) -> Self {
        Self {
            first_report: reader.first_report,
            tool_offsets: reader.tool_offsets.clone(),
            bed: reader.bed,
            ignore_outside_bed: reader.ignore_outside_bed,
            g90_influences_extruder: reader.g90_influences_extruder,
            bed_z: reader.bed_z,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from(&ReaderOptions::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRequest {
    pub gcode: Vec<GcodeLine>,
    pub options: ParseOptions,
}

/// Messages sent to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "msg")]
pub enum WorkerRequest {
    #[serde(rename = "parseGCode")]
    ParseGCode(ParseRequest),
    #[serde(rename = "analyzeModel")]
    AnalyzeModel {},
}

impl WorkerRequest {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ParseGCode(_) => "parseGCode",
            Self::AnalyzeModel {} => "analyzeModel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZHeightEntry {
    pub z_value: f64,
    pub layer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPayload {
    pub layer_num: usize,
    pub cmds: Vec<Command>,
    pub z_height_object: ZHeightEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiZHeights {
    pub z_value: Vec<f64>,
}

/// Several layers in one message; `layer_num[i]` sits at `z_value[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLayerPayload {
    pub layer_num: Vec<usize>,
    pub model: BTreeMap<usize, Vec<Command>>,
    pub z_height_object: MultiZHeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub progress: f64,
}

/// Messages sent back by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "msg")]
pub enum WorkerReply {
    #[serde(rename = "returnLayer")]
    ReturnLayer(LayerPayload),
    #[serde(rename = "returnMultiLayer")]
    ReturnMultiLayer(MultiLayerPayload),
    #[serde(rename = "returnModel")]
    ReturnModel,
    #[serde(rename = "analyzeProgress")]
    AnalyzeProgress(ProgressPayload),
    #[serde(rename = "analyzeDone")]
    AnalyzeDone(Box<ModelInfo>),
}

impl WorkerReply {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ReturnLayer(_) => "returnLayer",
            Self::ReturnMultiLayer(_) => "returnMultiLayer",
            Self::ReturnModel => "returnModel",
            Self::AnalyzeProgress(_) => "analyzeProgress",
            Self::AnalyzeDone(_) => "analyzeDone",
        }
    }
}

/// A message stamped with the load it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub generation: u64,
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn new(generation: u64, body: T) -> Self {
        Self { generation, body }
    }
}
