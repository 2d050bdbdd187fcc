//! loxvm-tools — shared library for the loxvm command-line tools.
//!
//! ## Key areas
//! - `prelude` : quick import of the usual types/fns
//! - I/O       : `read_text`, `read_stdin_to_string`, `read_source`
//! - Time      : `Timer`, `human_millis`
//! - Colors    : `ColorMode`, `setup_colors`
//! - Logs      : `init_tracing`
//! - Config    : `ToolConfig`, `load_config` (`.loxvm.toml`)
//! - Bytecode  : `assemble_source`, `ChunkReport`, `summary`
//! - Drivers   : `check_inputs`, `render_chunk`, `run_chunk`
//!
//! Everything returns `anyhow::Result`; binaries only add argument parsing.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

use std::fs;
use std::io::{self, Read};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use loxvm_core::asm::assemble;
use loxvm_core::disasm::{disassemble_chunk, disassemble_compact};
use loxvm_core::helpers::{instructions, validate_chunk, Instruction};
use loxvm_core::runtime::{Vm, VmConfig, DEFAULT_STACK_MAX};
use loxvm_core::{Chunk, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the configuration file looked up by [`load_config`].
pub const CONFIG_FILE: &str = ".loxvm.toml";

/// Short version banner for logs.
#[must_use]
pub fn version_banner(tool: &str) -> String {
    format!("{tool} — loxvm-tools {VERSION}")
}

/* ------------------------------------------------------------------------- */
/* Prelude                                                                   */
/* ------------------------------------------------------------------------- */

/// Compact re-exports for the binaries.
pub mod prelude {
    pub use anyhow::{anyhow, bail, Context, Result};
    pub use camino::{Utf8Path, Utf8PathBuf};
    pub use crate::{
        assemble_source, check_inputs, human_millis, init_tracing, load_config, read_source,
        render_chunk, run_chunk, setup_colors, summary, version_banner, ChunkReport, ColorMode,
        DisasmOptions, ListingMode, Timer, ToolConfig,
    };
}

/* ------------------------------------------------------------------------- */
/* I/O utils                                                                 */
/* ------------------------------------------------------------------------- */

/// Reads a UTF-8 text file.
///
/// # Errors
/// I/O or UTF-8 failure, with the path attached.
pub fn read_text(path: &Utf8Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

/// Reads all of `stdin` as UTF-8.
///
/// # Errors
/// I/O or UTF-8 failure.
pub fn read_stdin_to_string() -> Result<String> {
    let mut s = String::new();
    io::stdin().read_to_string(&mut s).context("reading stdin")?;
    Ok(s)
}

/// Reads `input` (`-` means stdin) and returns `(text, display name)`.
///
/// # Errors
/// See [`read_text`] and [`read_stdin_to_string`].
pub fn read_source(input: &str, stdin_name: &str) -> Result<(String, String)> {
    if input == "-" {
        Ok((read_stdin_to_string()?, stdin_name.to_owned()))
    } else {
        Ok((read_text(Utf8Path::new(input))?, input.to_owned()))
    }
}

/// Assembles `text`, attaching `name` to any error.
///
/// # Errors
/// The assembler's error, prefixed with `assembling <name>`.
pub fn assemble_source(text: &str, name: &str) -> Result<Chunk> {
    assemble(text).with_context(|| format!("assembling {name}"))
}

/* ------------------------------------------------------------------------- */
/* Time / chrono                                                             */
/* ------------------------------------------------------------------------- */

/// Simple scope timer.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Starts the timer.
    #[must_use]
    pub fn start() -> Self { Self { start: Instant::now() } }
    /// Elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration { self.start.elapsed() }
    /// Short human format.
    #[must_use]
    pub fn pretty(&self) -> String { human_millis(self.elapsed()) }
}

/// Human-friendly duration.
#[must_use]
pub fn human_millis(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1_000 {
        return format!("{ms} ms");
    }
    let s = d.as_secs_f64();
    if s < 60.0 {
        return format!("{s:.3} s");
    }
    let m = (s / 60.0).floor();
    let rest = s - m * 60.0;
    format!("{m:.0} min {rest:.1} s")
}

/* ------------------------------------------------------------------------- */
/* Colors                                                                    */
/* ------------------------------------------------------------------------- */

/// ANSI color policy for CLI output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colors only when the output supports them.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

/// Applies the global color mode (no-op without the `colors` feature).
pub fn setup_colors(mode: ColorMode) {
    #[cfg(feature = "colors")]
    {
        match mode {
            ColorMode::Auto => yansi::whenever(yansi::Condition::DEFAULT),
            ColorMode::Always => yansi::enable(),
            ColorMode::Never => yansi::disable(),
        }
    }
    #[cfg(not(feature = "colors"))]
    {
        let _ = mode;
    }
}

/* ------------------------------------------------------------------------- */
/* Logs                                                                      */
/* ------------------------------------------------------------------------- */

/// Installs a stderr `tracing` subscriber.
///
/// `verbose` (count of `-v`) wins over the environment; otherwise the
/// filter comes from `LOXVM_LOG`, then `RUST_LOG`, then defaults to `warn`.
/// Calling it twice is harmless.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("LOXVM_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/* ------------------------------------------------------------------------- */
/* Config                                                                    */
/* ------------------------------------------------------------------------- */

/// Settings read from `.loxvm.toml`; command-line flags override them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Maximum VM stack depth.
    pub stack_max: usize,
    /// Trace every dispatched instruction.
    pub trace: bool,
    /// Color policy.
    pub color: ColorMode,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self { stack_max: DEFAULT_STACK_MAX, trace: false, color: ColorMode::Auto }
    }
}

impl ToolConfig {
    /// Executor settings derived from this config.
    #[must_use]
    pub const fn vm_config(&self) -> VmConfig {
        VmConfig { stack_max: self.stack_max, trace: self.trace }
    }

    /// Applies command-line flags on top of the file values.
    ///
    /// # Errors
    /// When the resulting `stack_max` is 0.
    pub fn with_overrides(
        mut self,
        stack_max: Option<usize>,
        trace: bool,
        color: Option<ColorMode>,
    ) -> Result<Self> {
        if let Some(n) = stack_max {
            self.stack_max = n;
        }
        self.trace |= trace;
        if let Some(c) = color {
            self.color = c;
        }
        if self.stack_max == 0 {
            bail!("stack_max must be at least 1");
        }
        Ok(self)
    }
}

/// Loads `explicit` if given, else searches `.loxvm.toml` upward from the
/// current directory, else returns `Default`.
///
/// # Errors
/// Unreadable current directory, or see [`load_config_from`].
pub fn load_config(explicit: Option<&Utf8Path>) -> Result<ToolConfig> {
    let cwd = std::env::current_dir().context("current directory")?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))?;
    load_config_from(&cwd, explicit)
}

/// [`load_config`] with an explicit starting directory.
///
/// # Errors
/// Unreadable file, invalid TOML or unknown keys.
pub fn load_config_from(start: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<ToolConfig> {
    if let Some(path) = explicit {
        return parse_config(path);
    }
    for dir in start.ancestors() {
        let cand = dir.join(CONFIG_FILE);
        if cand.is_file() {
            return parse_config(&cand);
        }
    }
    Ok(ToolConfig::default())
}

fn parse_config(path: &Utf8Path) -> Result<ToolConfig> {
    let text = read_text(path)?;
    let cfg: ToolConfig = toml::from_str(&text).with_context(|| format!("invalid TOML in {path}"))?;
    tracing::debug!(%path, ?cfg, "config loaded");
    Ok(cfg)
}

/* ------------------------------------------------------------------------- */
/* Structured views                                                          */
/* ------------------------------------------------------------------------- */

/// Span of consecutive bytes on one source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRun {
    /// First offset.
    pub start: usize,
    /// One past the last offset.
    pub end: usize,
    /// Source line.
    pub line: u32,
}

/// JSON-friendly view of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReport {
    /// Display name of the input.
    pub name: String,
    /// Code length in bytes.
    pub bytes: usize,
    /// Tracked capacity of the code/line buffers.
    pub capacity: usize,
    /// Constant pool.
    pub constants: Vec<Value>,
    /// Run-length view of the line table.
    pub line_runs: Vec<LineRun>,
    /// Instructions decoded before the first error.
    pub instructions: Vec<Instruction>,
    /// Decoding error, if the code is malformed.
    pub error: Option<String>,
}

impl ChunkReport {
    /// Builds the view.
    #[must_use]
    pub fn new(chunk: &Chunk, name: &str) -> Self {
        let mut decoded = Vec::new();
        let mut error = None;
        for item in instructions(chunk) {
            match item {
                Ok(ins) => decoded.push(ins),
                Err(e) => error = Some(e.to_string()),
            }
        }
        Self {
            name: name.to_owned(),
            bytes: chunk.len(),
            capacity: chunk.capacity(),
            constants: chunk.constants().as_slice().to_vec(),
            line_runs: chunk
                .line_runs()
                .map(|(range, line)| LineRun { start: range.start, end: range.end, line })
                .collect(),
            instructions: decoded,
            error,
        }
    }
}

/// One-line summary of a chunk.
#[must_use]
pub fn summary(chunk: &Chunk, name: &str) -> String {
    let ops = instructions(chunk).map_while(Result::ok).count();
    format!(
        "{name}: {} bytes (capacity {}), {} constants, {ops} instructions, {} line runs",
        chunk.len(),
        chunk.capacity(),
        chunk.constants().len(),
        chunk.line_runs().count(),
    )
}

/* ------------------------------------------------------------------------- */
/* Drivers                                                                   */
/* ------------------------------------------------------------------------- */

/// What `loxvm-disasm` prints for each input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingMode {
    /// Header, line numbers, one line per instruction.
    #[default]
    Full,
    /// One line per instruction, no line numbers.
    Compact,
    /// See [`summary`].
    Summary,
    /// Pretty-printed [`ChunkReport`].
    Json,
}

impl ListingMode {
    /// Mode picked by the (mutually exclusive) output flags.
    #[must_use]
    pub const fn from_flags(compact: bool, summary: bool, json: bool) -> Self {
        if json {
            Self::Json
        } else if summary {
            Self::Summary
        } else if compact {
            Self::Compact
        } else {
            Self::Full
        }
    }
}

/// Per-input settings of `loxvm-disasm`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisasmOptions {
    /// Output format.
    pub mode: ListingMode,
    /// Run the structural validator first.
    pub verify: bool,
    /// Reject empty chunks.
    pub strict: bool,
}

/// Rejects `-` (stdin) mixed with other inputs.
///
/// # Errors
/// When `-` is not the only input.
pub fn check_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<()> {
    if inputs.len() > 1 && inputs.iter().any(|i| i.as_ref() == "-") {
        bail!("'-' (stdin) cannot be mixed with other inputs");
    }
    Ok(())
}

/// Text printed by `loxvm-disasm` for one chunk.
///
/// # Errors
/// Empty chunk under `strict`, validation failure under `verify`.
pub fn render_chunk(chunk: &Chunk, name: &str, opts: DisasmOptions) -> Result<String> {
    if opts.strict && chunk.is_empty() {
        bail!("{name}: empty chunk (--strict)");
    }
    if opts.verify {
        validate_chunk(chunk).with_context(|| format!("verifying {name}"))?;
    }
    Ok(match opts.mode {
        ListingMode::Full => disassemble_chunk(chunk, name),
        ListingMode::Compact => disassemble_compact(chunk),
        ListingMode::Summary => format!("{}\n", summary(chunk, name)),
        ListingMode::Json => {
            let report = ChunkReport::new(chunk, name);
            format!("{}\n", serde_json::to_string_pretty(&report).context("encoding JSON")?)
        }
    })
}

/// Runs `chunk` with the executor settings of `cfg`.
///
/// # Errors
/// The executor's error, prefixed with `running <name>`.
pub fn run_chunk(chunk: &Chunk, name: &str, cfg: &ToolConfig) -> Result<Option<Value>> {
    Vm::new(cfg.vm_config()).interpret(chunk).with_context(|| format!("running {name}"))
}

/* ------------------------------------------------------------------------- */
/* Tests                                                                     */
/* ------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use loxvm_core::OpCode;
    use pretty_assertions::assert_eq;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn human_millis_formats() {
        assert_eq!(human_millis(Duration::from_millis(12)), "12 ms");
        assert_eq!(human_millis(Duration::from_millis(1_500)), "1.500 s");
        assert_eq!(human_millis(Duration::from_secs(90)), "1 min 30.0 s");
    }

    #[test]
    fn config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&utf8(&dir), None).unwrap();
        assert_eq!(cfg, ToolConfig::default());
        assert_eq!(cfg.vm_config(), VmConfig::default());
    }

    #[test]
    fn config_found_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        fs::write(root.join(CONFIG_FILE), "stack_max = 16\ncolor = \"never\"\n").unwrap();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let cfg = load_config_from(&nested, None).unwrap();
        assert_eq!(cfg, ToolConfig { stack_max: 16, trace: false, color: ColorMode::Never });
    }

    #[test]
    fn config_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8(&dir).join("custom.toml");
        fs::write(&path, "stack = 3\n").unwrap();
        let err = load_config_from(&utf8(&dir), Some(path.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("invalid TOML"));
    }

    #[test]
    fn report_and_summary() {
        let chunk = assemble_source("CONSTANT 2\n@3 NEGATE\nRETURN", "t.lasm").unwrap();
        let report = ChunkReport::new(&chunk, "t.lasm");
        assert_eq!(report.bytes, 4);
        assert_eq!(report.constants, vec![Value(2.0)]);
        assert_eq!(
            report.line_runs,
            vec![LineRun { start: 0, end: 2, line: 1 }, LineRun { start: 2, end: 4, line: 3 }]
        );
        assert_eq!(report.instructions.len(), 3);
        assert_eq!(report.instructions[1].op, OpCode::Negate);
        assert_eq!(report.error, None);
        assert_eq!(
            summary(&chunk, "t.lasm"),
            "t.lasm: 4 bytes (capacity 8), 1 constants, 3 instructions, 2 line runs"
        );
    }

    #[test]
    fn report_keeps_decode_error() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::Return, 1);
        chunk.write(99u8, 1);
        let report = ChunkReport::new(&chunk, "bad");
        assert_eq!(report.instructions.len(), 1);
        assert_eq!(report.error.as_deref(), Some("unknown opcode 99 at offset 1"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["instructions"][0]["op"], "Return");
    }

    #[test]
    fn assemble_errors_name_the_input() {
        let err = assemble_source("NOPE", "x.lasm").unwrap_err();
        assert_eq!(format!("{err:#}"), "assembling x.lasm: line 1: unknown instruction `NOPE`");
    }

    #[test]
    fn stdin_must_be_the_only_input() {
        assert!(check_inputs(&["-"]).is_ok());
        assert!(check_inputs(&["a.lasm", "b.lasm"]).is_ok());
        let err = check_inputs(&["a.lasm", "-"]).unwrap_err();
        assert_eq!(err.to_string(), "'-' (stdin) cannot be mixed with other inputs");
    }

    #[test]
    fn output_flags_pick_one_mode() {
        assert_eq!(ListingMode::from_flags(false, false, false), ListingMode::Full);
        assert_eq!(ListingMode::from_flags(true, false, false), ListingMode::Compact);
        assert_eq!(ListingMode::from_flags(false, true, false), ListingMode::Summary);
        assert_eq!(ListingMode::from_flags(false, false, true), ListingMode::Json);
    }

    #[test]
    fn default_render_is_the_full_listing() {
        let chunk = assemble_source("CONSTANT 2\nRETURN", "t.lasm").unwrap();
        let out = render_chunk(&chunk, "t.lasm", DisasmOptions::default()).unwrap();
        assert_eq!(out, disassemble_chunk(&chunk, "t.lasm"));
        assert!(out.starts_with("== t.lasm ==\n"));
    }

    #[test]
    fn render_modes() {
        let chunk = assemble_source("CONSTANT 2\nRETURN", "t.lasm").unwrap();
        let opts = |mode| DisasmOptions { mode, ..DisasmOptions::default() };

        let compact = render_chunk(&chunk, "t.lasm", opts(ListingMode::Compact)).unwrap();
        assert_eq!(compact, disassemble_compact(&chunk));

        let line = render_chunk(&chunk, "t.lasm", opts(ListingMode::Summary)).unwrap();
        assert_eq!(line, format!("{}\n", summary(&chunk, "t.lasm")));

        let json = render_chunk(&chunk, "t.lasm", opts(ListingMode::Json)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["name"], "t.lasm");
        assert_eq!(parsed["bytes"], 3);
    }

    #[test]
    fn strict_rejects_empty_chunk() {
        let empty = Chunk::new();
        let strict = DisasmOptions { strict: true, ..DisasmOptions::default() };
        let err = render_chunk(&empty, "e.lasm", strict).unwrap_err();
        assert_eq!(err.to_string(), "e.lasm: empty chunk (--strict)");
        let out = render_chunk(&empty, "e.lasm", DisasmOptions::default()).unwrap();
        assert_eq!(out, "== e.lasm ==\n");
    }

    #[test]
    fn verify_rejects_dangling_constant() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::Constant, 5);
        chunk.write(3u8, 5);
        let verify = DisasmOptions { verify: true, ..DisasmOptions::default() };
        let err = render_chunk(&chunk, "bad", verify).unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "verifying bad: line 5: constant 3 at offset 0 is out of range (pool holds 0)"
        );
        assert!(render_chunk(&chunk, "bad", DisasmOptions::default()).is_ok());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = ToolConfig { stack_max: 16, trace: false, color: ColorMode::Never };
        let cfg = file.clone().with_overrides(Some(4), true, Some(ColorMode::Always)).unwrap();
        assert_eq!(cfg, ToolConfig { stack_max: 4, trace: true, color: ColorMode::Always });
        assert_eq!(file.clone().with_overrides(None, false, None).unwrap(), file);
    }

    #[test]
    fn zero_stack_is_rejected() {
        let err = ToolConfig::default().with_overrides(Some(0), false, None).unwrap_err();
        assert_eq!(err.to_string(), "stack_max must be at least 1");
        let from_file = ToolConfig { stack_max: 0, ..ToolConfig::default() };
        assert!(from_file.with_overrides(None, false, None).is_err());
    }

    #[test]
    fn run_errors_name_the_input() {
        let chunk = assemble_source("NEGATE", "u.lasm").unwrap();
        let err = run_chunk(&chunk, "u.lasm", &ToolConfig::default()).unwrap_err();
        assert_eq!(format!("{err:#}"), "running u.lasm: [line 1] stack underflow in OP_NEGATE");
        let ok = assemble_source("CONSTANT 3\nNEGATE\nRETURN", "n.lasm").unwrap();
        assert_eq!(run_chunk(&ok, "n.lasm", &ToolConfig::default()).unwrap(), Some(Value(-3.0)));
    }
}
