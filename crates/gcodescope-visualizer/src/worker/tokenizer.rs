//! Tokenizer for the reference worker
//!
//! Turns percentage-annotated lines into commands grouped by Z height.
//! Only motion and positioning-mode instructions are recognized; everything
//! else is dropped by a pre-filter before any parameter parsing happens.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, trace};

use super::protocol::ParseOptions;
use crate::gcode::{Command, GcodeLine, Layer, ZKey};

/// Commands grouped into layers, indexed by layer number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedModel {
    pub layers: Vec<Layer>,
    pub z_heights: BTreeMap<ZKey, usize>,
}

impl ParsedModel {
    pub fn command_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }
}

/// Machine state carried from line to line
#[derive(Debug, Clone)]
struct MachineState {
    x: f64,
    y: f64,
    z: f64,
    e: f64,
    relative: bool,
    extruder_relative: bool,
    tool: u32,
    feed_rate: Option<f64>,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            e: 0.0,
            relative: false,
            extruder_relative: false,
            tool: 0,
            feed_rate: None,
        }
    }
}

/// Parameters of one instruction
#[derive(Debug, Default)]
struct Words {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    e: Option<f64>,
    f: Option<f64>,
}

impl Words {
    fn has_axis(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }
}

fn instruction_regex() -> &'static Regex {
    static INSTRUCTION_REGEX: OnceLock<Regex> = OnceLock::new();
    INSTRUCTION_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:N\d+\s*)?(G0?[0-3]|G9[0-2]|G28|M8[23]|T\d+)(?:[^\d.]|$)")
            .expect("invalid regex pattern")
    })
}

fn word_regex() -> &'static Regex {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    WORD_REGEX.get_or_init(|| {
        Regex::new(r"(?i)([XYZEF])\s*([-+]?(?:\d+\.?\d*|\.\d+))").expect("invalid regex pattern")
    })
}

/// Remove `;` and `( )` comments
fn strip_comments(line: &str) -> &str {
    let end = line.find([';', '(']).unwrap_or(line.len());
    &line[..end]
}

fn parse_words(params: &str) -> Words {
    let mut words = Words::default();
    for caps in word_regex().captures_iter(params) {
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        match caps[1].to_ascii_uppercase().as_str() {
            "X" => words.x = Some(value),
            "Y" => words.y = Some(value),
            "Z" => words.z = Some(value),
            "E" => words.e = Some(value),
            "F" => words.f = Some(value),
            _ => {}
        }
    }
    words
}

/// Normalize "G01" to "G1", "t2" to "T2"
fn normalize_word(word: &str) -> String {
    let upper = word.to_ascii_uppercase();
    let (letter, number) = upper.split_at(1);
    match number.parse::<u32>() {
        Ok(n) => format!("{letter}{n}"),
        Err(_) => upper,
    }
}

/// Line-by-line G-code tokenizer
pub struct Tokenizer {
    options: ParseOptions,
    state: MachineState,
    model: ParsedModel,
}

impl Tokenizer {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            state: MachineState::default(),
            model: ParsedModel::default(),
        }
    }

    /// Tokenize a whole file
    pub fn parse(options: ParseOptions, lines: &[GcodeLine]) -> ParsedModel {
        let mut tokenizer = Self::new(options);
        for (number, line) in lines.iter().enumerate() {
            tokenizer.feed(number, line);
        }
        tokenizer.finish()
    }

    pub fn feed(&mut self, number: usize, line: &GcodeLine) {
        let code = strip_comments(&line.line);
        let Some(caps) = instruction_regex().captures(code) else {
            return;
        };
        let Some(word) = caps.get(1) else {
            return;
        };
        let instruction = normalize_word(word.as_str());
        let params = &code[word.end()..];
        let words = parse_words(params);
        trace!("Line {}: {}", number, instruction);

        match instruction.as_str() {
            "G0" | "G1" | "G2" | "G3" => self.motion(number, line.percentage, instruction, &words),
            "G28" => self.home(number, line.percentage, params),
            "G90" => self.set_relative(false),
            "G91" => self.set_relative(true),
            "G92" => self.set_position(&words),
            "M82" => self.state.extruder_relative = false,
            "M83" => self.state.extruder_relative = true,
            tool if tool.starts_with('T') => {
                if let Ok(n) = tool[1..].parse::<u32>() {
                    self.state.tool = n;
                }
            }
            _ => {}
        }
    }

    pub fn finish(self) -> ParsedModel {
        debug!(
            "Tokenized {} commands into {} layers",
            self.model.command_count(),
            self.model.layers.len()
        );
        self.model
    }

    fn set_relative(&mut self, relative: bool) {
        self.state.relative = relative;
        if self.options.g90_influences_extruder {
            self.state.extruder_relative = relative;
        }
    }

    fn set_position(&mut self, words: &Words) {
        if let Some(x) = words.x {
            self.state.x = x;
        }
        if let Some(y) = words.y {
            self.state.y = y;
        }
        if let Some(z) = words.z {
            self.state.z = z;
        }
        if let Some(e) = words.e {
            self.state.e = e;
        }
    }

    fn resolve(&self, current: f64, value: Option<f64>) -> Option<f64> {
        value.map(|v| if self.state.relative { current + v } else { v })
    }

    fn tool_offset(&self) -> (f64, f64) {
        self.options
            .tool_offsets
            .get(self.state.tool as usize)
            .map(|offset| (offset.x, offset.y))
            .unwrap_or((0.0, 0.0))
    }

    /// Absolute position of the active tool, offsets applied
    fn position(&self) -> (f64, f64, f64) {
        let (offset_x, offset_y) = self.tool_offset();
        (
            self.state.x + offset_x,
            self.state.y + offset_y,
            self.state.z,
        )
    }

    /// Command moving from `start` to the current position
    fn command(
        &self,
        number: usize,
        percentage: f64,
        gcode: String,
        start: (f64, f64, f64),
    ) -> Command {
        let (x, y, z) = self.position();
        Command {
            line: number,
            gcode,
            x,
            y,
            z,
            prev_x: start.0,
            prev_y: start.1,
            prev_z: start.2,
            feed_rate: self.state.feed_rate,
            tool: self.state.tool,
            percentage,
            ..Default::default()
        }
    }

    fn motion(&mut self, number: usize, percentage: f64, gcode: String, words: &Words) {
        if let Some(f) = words.f {
            self.state.feed_rate = Some(f);
        }

        let x = self.resolve(self.state.x, words.x);
        let y = self.resolve(self.state.y, words.y);
        let z = self
            .resolve(self.state.z, words.z)
            .map(|z| z.max(self.options.bed_z));

        let start = self.position();
        let moved_xy = x.is_some_and(|v| v != self.state.x) || y.is_some_and(|v| v != self.state.y);

        let delta_e = words.e.map(|e| {
            if self.state.extruder_relative {
                e
            } else {
                e - self.state.e
            }
        });

        if let Some(x) = x {
            self.state.x = x;
        }
        if let Some(y) = y {
            self.state.y = y;
        }
        if let Some(z) = z {
            self.state.z = z;
        }
        if let Some(delta) = delta_e {
            self.state.e += delta;
        }

        if !words.has_axis() && delta_e.is_none() {
            return;
        }

        let mut extrude = moved_xy && delta_e.is_some_and(|d| d > 0.0);
        if extrude
            && self.options.ignore_outside_bed
            && !self.options.bed.contains(self.state.x, self.state.y)
        {
            trace!("Line {}: extrusion outside bed ignored", number);
            extrude = false;
        }

        let command = Command {
            e: delta_e,
            extrude,
            retract: delta_e.is_some_and(|d| d < 0.0),
            ..self.command(number, percentage, gcode, start)
        };
        self.push(command);
    }

    /// G28 names axes without values ("G28 X Y")
    fn home(&mut self, number: usize, percentage: f64, params: &str) {
        let params = params.to_ascii_uppercase();
        let named = |axis: char| params.contains(axis);
        let all = !(named('X') || named('Y') || named('Z'));
        let start = self.position();
        if all || named('X') {
            self.state.x = 0.0;
        }
        if all || named('Y') {
            self.state.y = 0.0;
        }
        if all || named('Z') {
            self.state.z = self.options.bed_z.max(0.0);
        }
        let command = self.command(number, percentage, "G28".to_string(), start);
        self.push(command);
    }

    /// File the command under the layer of the current Z height
    fn push(&mut self, command: Command) {
        let z = self.state.z;
        let key = ZKey::from_z(z);
        let next = self.model.layers.len();
        let layer = *self.model.z_heights.entry(key).or_insert(next);
        if layer == next {
            self.model.layers.push(Layer::new(layer, key.z(), Vec::new()));
        }
        self.model.layers[layer].commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::split_lines;
    use gcodescope_settings::{BedSettings, ToolOffset};
    use glam::DVec3;

    fn parse(text: &str) -> ParsedModel {
        Tokenizer::parse(ParseOptions::default(), &split_lines(text))
    }

    fn all_commands(model: &ParsedModel) -> Vec<&Command> {
        model.layers.iter().flat_map(|l| l.commands.iter()).collect()
    }

    #[test]
    fn test_unrecognized_lines_are_skipped() {
        let model = parse("; comment\nM104 S200\n\nG1 X10 Y10 E1\nfoo bar\nG10\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].line, 3);
        assert_eq!(cmds[0].gcode, "G1");
    }

    #[test]
    fn test_omitted_axes_carry_forward() {
        let model = parse("G1 X10 Y10 E1\nG1 X20\nG1 Z0.2\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds[1].start(), DVec3::new(10.0, 10.0, 0.0));
        assert_eq!(cmds[1].end(), DVec3::new(20.0, 10.0, 0.0));
        assert_eq!(cmds[1].z, cmds[0].z);
        assert_eq!(cmds[2].start(), cmds[1].end());
        assert_eq!(cmds[2].end(), DVec3::new(20.0, 10.0, 0.2));
    }

    #[test]
    fn test_positions_follow_file_order_across_z_hops() {
        let model = parse(
            "G1 Z0.2\nG1 X0 Y0\nG1 X10 Y0 E1\nG1 Z0.4\nG1 X20 Y20\nG1 Z0.2\nG1 X30 E2\n",
        );
        assert_eq!(model.layers.len(), 2);
        let first = &model.layers[0].commands;
        let last = first.last().unwrap();
        assert_eq!(last.line, 6);
        assert_eq!(last.start(), DVec3::new(20.0, 20.0, 0.2));
        assert_eq!(last.end(), DVec3::new(30.0, 20.0, 0.2));
        assert!(last.extrude);
    }

    #[test]
    fn test_layers_follow_z() {
        let model = parse("G1 Z0.2\nG1 X1 E1\nG1 Z0.4\nG1 X2 E2\nG1 Z0.2\nG1 X3 E3\n");
        assert_eq!(model.layers.len(), 2);
        assert_eq!(model.z_heights[&ZKey::from_z(0.2)], 0);
        assert_eq!(model.z_heights[&ZKey::from_z(0.4)], 1);
        assert_eq!(model.layers[0].commands.len(), 4);
        assert_eq!(model.layers[1].commands.len(), 2);
    }

    #[test]
    fn test_extrusion_and_retraction() {
        let model = parse("G1 X10 E1\nG1 E0.5\nG1 E1\nG1 X20 F3000\nG1 X30 E2\n");
        let cmds = all_commands(&model);
        assert!(cmds[0].extrude);
        assert!(!cmds[1].extrude && cmds[1].retract);
        assert_eq!(cmds[1].e, Some(-0.5));
        assert!(!cmds[2].extrude && !cmds[2].retract);
        assert!(!cmds[3].extrude);
        assert_eq!(cmds[3].feed_rate, Some(3000.0));
        assert!(cmds[4].extrude);
        assert_eq!(cmds[4].e, Some(1.0));
    }

    #[test]
    fn test_relative_positioning() {
        let model = parse("G1 X10 Y10\nG91\nG1 X5 E1\nG90\nG1 X1\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds[1].x, 15.0);
        assert_eq!(cmds[1].y, 10.0);
        assert_eq!(cmds[2].prev_x, 15.0);
        assert_eq!(cmds[2].x, 1.0);
    }

    #[test]
    fn test_relative_extruder() {
        let model = parse("M83\nG1 X1 E0.5\nG1 X2 E0.5\nM82\nG92 E0\nG1 X3 E0.25\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds[0].e, Some(0.5));
        assert_eq!(cmds[1].e, Some(0.5));
        assert_eq!(cmds[2].e, Some(0.25));
        assert!(cmds.iter().all(|c| c.extrude));
    }

    #[test]
    fn test_g90_influences_extruder() {
        let options = ParseOptions {
            g90_influences_extruder: true,
            ..Default::default()
        };
        let model = Tokenizer::parse(options, &split_lines("G91\nG1 X1 E1\nG1 X1 E1\n"));
        let cmds = all_commands(&model);
        assert_eq!(cmds[1].e, Some(1.0));
        assert_eq!(cmds[1].x, 2.0);
    }

    #[test]
    fn test_tool_offsets() {
        let options = ParseOptions {
            tool_offsets: vec![ToolOffset::default(), ToolOffset { x: 10.0, y: -5.0 }],
            ..Default::default()
        };
        let model = Tokenizer::parse(options, &split_lines("G1 X1 Y1 E1\nT1\nG1 X1 Y1 E2\n"));
        let cmds = all_commands(&model);
        assert_eq!((cmds[0].x, cmds[0].y), (1.0, 1.0));
        assert_eq!((cmds[1].x, cmds[1].y), (11.0, -4.0));
        assert_eq!(cmds[1].tool, 1);
    }

    #[test]
    fn test_ignore_outside_bed() {
        let options = ParseOptions {
            ignore_outside_bed: true,
            bed: BedSettings {
                x: 100.0,
                y: 100.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let model = Tokenizer::parse(options, &split_lines("G1 X50 Y50 E1\nG1 X150 Y50 E2\n"));
        let cmds = all_commands(&model);
        assert!(cmds[0].extrude);
        assert!(!cmds[1].extrude);
    }

    #[test]
    fn test_bed_z_clamps() {
        let options = ParseOptions {
            bed_z: 0.1,
            ..Default::default()
        };
        let model = Tokenizer::parse(options, &split_lines("G1 Z-1\n"));
        assert_eq!(all_commands(&model)[0].z, 0.1);
    }

    #[test]
    fn test_tight_formatting_and_line_numbers() {
        let model = parse("N10 G01X5Y6E1 ; move\n(comment) G1 X9\ng1 x7\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].gcode, "G1");
        assert_eq!((cmds[0].x, cmds[0].y), (5.0, 6.0));
        assert_eq!(cmds[1].x, 7.0);
    }

    #[test]
    fn test_home() {
        let model = parse("G1 X5 Y5 Z1\nG28 X\nG28\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds[1].start(), DVec3::new(5.0, 5.0, 1.0));
        assert_eq!(cmds[1].end(), DVec3::new(0.0, 5.0, 1.0));
        assert_eq!(cmds[2].end(), DVec3::ZERO);
    }

    #[test]
    fn test_dotted_subcodes_are_not_their_base_instruction() {
        let model = parse("G1 X5 Y5\nG92.1\nG1 X6\n");
        let cmds = all_commands(&model);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1].start(), DVec3::new(5.0, 5.0, 0.0));
        assert_eq!(cmds[1].x, 6.0);
    }
}
