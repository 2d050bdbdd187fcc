// crates/loxvm-tools/src/bin/loxvm-disasm.rs
//! loxvm disassembler for assembly sources (`.lasm`).
//!
//! Examples:
//!   loxvm-disasm demo.lasm
//!   loxvm-disasm a.lasm b.lasm --summary
//!   cat demo.lasm | loxvm-disasm - --stdin-name demo.lasm --compact
//!   loxvm-disasm demo.lasm --json | jq
//!
//! Useful options:
//!   --compact       : one line per instruction, no line numbers
//!   --summary       : counts (bytes/capacity/constants/instructions)
//!   --json          : structured view
//!   (at most one of --compact/--summary/--json)
//!   --verify        : structural validation (opcodes, operands, constant indices)
//!   --strict        : fail on an empty chunk
//!   --color <mode>  : auto|always|never
//!   --time          : timing

use clap::{ArgGroup, Parser};
use yansi::Paint;

use loxvm_tools::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "loxvm-disasm", version, about = "loxvm disassembler (.lasm -> text/JSON)")]
#[command(group(
    ArgGroup::new("stdout_mode")
        .args(["compact", "json", "summary"])
        .multiple(false)
))]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input file(s), or '-' for stdin (alone)
    #[arg(required = true)]
    inputs: Vec<String>,

    /// One line per instruction, without line numbers
    #[arg(long)]
    compact: bool,

    /// Print a structured JSON view
    #[arg(long)]
    json: bool,

    /// Print a one-line summary
    #[arg(long)]
    summary: bool,

    /// Validate the chunk structure
    #[arg(long)]
    verify: bool,

    /// Fail if a chunk is empty
    #[arg(long)]
    strict: bool,

    /// Logical name when the input is '-'
    #[arg(long, default_value = "<stdin>")]
    stdin_name: String,

    /// Print processing time
    #[arg(long)]
    time: bool,

    /// Colors: auto|always|never (overrides the config file)
    #[arg(long, value_enum)]
    color: Option<ColorMode>,

    /// Explicit config file (otherwise `.loxvm.toml` is searched upward)
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// More logs (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("{}", version_banner("loxvm-disasm"));

    let cfg = load_config(cli.config.as_deref())?;
    setup_colors(cli.color.unwrap_or(cfg.color));

    check_inputs(&cli.inputs)?;
    let opts = DisasmOptions {
        mode: ListingMode::from_flags(cli.compact, cli.summary, cli.json),
        verify: cli.verify,
        strict: cli.strict,
    };

    for input in &cli.inputs {
        let timer = Timer::start();
        let (text, name) = read_source(input, &cli.stdin_name)?;
        let chunk = assemble_source(&text, &name)?;
        let out = render_chunk(&chunk, &name, opts)?;
        if opts.verify {
            eprintln!("{} {name}", "verified".green());
        }
        print!("{out}");
        if cli.time {
            eprintln!("{} {name}: {}", "time".dim(), timer.pretty());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn output_modes_are_exclusive() {
        let err = Cli::try_parse_from(["loxvm-disasm", "a.lasm", "--json", "--compact"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let cli = Cli::try_parse_from(["loxvm-disasm", "a.lasm", "--summary", "--verify"]).unwrap();
        assert_eq!(ListingMode::from_flags(cli.compact, cli.summary, cli.json), ListingMode::Summary);
        assert!(cli.verify);
    }
}
