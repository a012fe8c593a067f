//! Replays reverse-mode differentiation of an expression step by step.
//!
//! Usage:
//!   gradwalk "(a + b) * c" -v a=1 -v b=2 -v c=3
//!   gradwalk "x ^ 2" -v x=3 --fifo --dot-dir target/frames --show-values
//!
//! The dot files can be turned into an animation with graphviz, e.g.
//! `dot -Tpng frame0.dot -o frame0.png`.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use gradwalk::{
    parse::{parse, parse_binding},
    Frame, FrameDotBuilder, PopOrder, Walker, WalkerConfig,
};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(name = "gradwalk")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Expression to differentiate, e.g. "sin(x) * y"
    #[arg(value_name = "EXPR")]
    expr: String,

    /// Bind a variable (e.g., -v x=1.5)
    #[arg(short = 'v', long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Replay breadth-first instead of most-recently-queued first
    #[arg(long)]
    fifo: bool,

    /// Maximum characters per printed number
    #[arg(short, long, default_value = "4")]
    precision: usize,

    /// Write one graphviz file per frame into this directory
    #[arg(long, value_name = "DIR")]
    dot_dir: Option<PathBuf>,

    /// Print forward values in the graphviz node labels
    #[arg(long)]
    show_values: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bindings = args
        .vars
        .iter()
        .map(|text| parse_binding(text))
        .collect::<Result<HashMap<_, _>, _>>()?;
    let root = parse(&args.expr, &bindings)?;

    let pop_order = if args.fifo {
        PopOrder::Fifo
    } else {
        PopOrder::Lifo
    };
    let config = WalkerConfig::default()
        .with_pop_order(pop_order)
        .with_precision(args.precision);
    let mut walker = Walker::with_config(&root, config);

    println!("f = {} = {}", root.name(), root.value());
    println!("frames: {}", walker.frame_budget());

    if let Some(dir) = &args.dot_dir {
        std::fs::create_dir_all(dir)?;
    }

    while let Some(frame) = walker.tick() {
        println!("--- frame {} at {}", frame.index, frame.node_name);
        println!("{}", frame.chain_rule);
        if let Some(dir) = &args.dot_dir {
            let path = dir.join(format!("frame{}.dot", frame.index));
            let builder = FrameDotBuilder::new(walker.sweep())
                .precision(config.precision)
                .show_values(args.show_values);
            write_dot(&path, &builder, &frame)?;
            info!("wrote {}", path.display());
        }
    }

    println!("---");
    for var in walker.sweep().variables() {
        println!("df/d{} = {}", var.name(), walker.adjoint(var));
    }
    Ok(())
}

fn write_dot(
    path: &Path,
    builder: &FrameDotBuilder<'_, f64>,
    frame: &Frame<f64>,
) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    builder.dot(frame, &mut file)?;
    file.flush()
}
