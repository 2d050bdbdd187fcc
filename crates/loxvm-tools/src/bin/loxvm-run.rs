// crates/loxvm-tools/src/bin/loxvm-run.rs
//! Assembles a `.lasm` source and runs it on the loxvm executor.
//!
//! Examples:
//!   loxvm-run demo.lasm
//!   loxvm-run demo.lasm --trace -vvv     # per-instruction trace on stderr
//!   echo "CONSTANT 2\nNEGATE\nRETURN" | loxvm-run -
//!
//! Exit status: 0 on success, 1 on assembly or runtime error.

use clap::Parser;
use yansi::Paint;

use loxvm_tools::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "loxvm-run", version, about = "Run a loxvm assembly source")]
struct Cli {
    /// Input file, or '-' for stdin
    input: String,

    /// Logical name when the input is '-'
    #[arg(long, default_value = "<stdin>")]
    stdin_name: String,

    /// Trace every dispatched instruction (visible at -vvv)
    #[arg(long)]
    trace: bool,

    /// Maximum stack depth (overrides the config file)
    #[arg(long)]
    stack_max: Option<usize>,

    /// Colors: auto|always|never (overrides the config file)
    #[arg(long, value_enum)]
    color: Option<ColorMode>,

    /// Explicit config file (otherwise `.loxvm.toml` is searched upward)
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Print processing time
    #[arg(long)]
    time: bool,

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
    tracing::debug!("{}", version_banner("loxvm-run"));

    let cfg = load_config(cli.config.as_deref())?.with_overrides(cli.stack_max, cli.trace, cli.color)?;
    setup_colors(cfg.color);

    let timer = Timer::start();
    let (text, name) = read_source(&cli.input, &cli.stdin_name)?;
    let chunk = assemble_source(&text, &name)?;

    match run_chunk(&chunk, &name, &cfg)? {
        Some(value) => println!("{value}"),
        None => println!("{}", "nil".dim()),
    }

    if cli.time {
        eprintln!("{} {name}: {}", "time".dim(), timer.pretty());
    }
    Ok(())
}
