use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use railnet::railnet_formats::RailnetFile;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod dot_writer;
mod pipeline;

use config::{CargoFilter, GraphConfig, parse_stretch};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print every cargo label used in a railnet file
    ListCargo {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Convert a railnet file into a Graphviz graph of its train lines
    Graph {
        #[arg(short, long)]
        input: PathBuf,
        /// Write the graph here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON file with graph settings; flags given here take precedence
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only draw these cargo labels, e.g. PASS,MAIL
        #[arg(short, long)]
        cargo: Option<CargoFilter>,
        /// Hide trains that stop at a subset of another train's stations
        #[arg(short = 's', long)]
        no_short_trains: bool,
        /// Hide trains that skip stations of another train
        #[arg(short = 'e', long)]
        no_express_trains: bool,
        /// Stretch factor for station coordinates, in [0.01, 100]
        #[arg(short = 'f', long, env = "RAILNET_STRETCH", value_parser = parse_stretch)]
        stretch: Option<f32>,
    },
    /// Re-encode a railnet file; `.json` outputs are JSON, anything else binary
    Convert {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn load(path: &Path) -> Result<RailnetFile> {
    let file = RailnetFile::load(path).with_context(|| format!("Failed to load {:?}", path))?;
    info!(
        "Loaded {:?}: {} order lists, {} stations, {} cargo labels",
        path,
        file.order_lists.len(),
        file.stations.len(),
        file.cargo_labels.len()
    );
    Ok(file)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.cmd {
        Command::ListCargo { input } => {
            let file = load(&input)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for name in pipeline::cargo_names(&file) {
                writeln!(out, "{}", name)?;
            }
        }
        Command::Graph {
            input,
            output,
            config,
            cargo,
            no_short_trains,
            no_express_trains,
            stretch,
        } => {
            let mut settings = match &config {
                Some(path) => GraphConfig::load(path)?,
                None => GraphConfig::default(),
            };
            if cargo.is_some() {
                settings.cargo = cargo;
            }
            settings.hide_short_trains |= no_short_trains;
            settings.hide_express_trains |= no_express_trains;
            if let Some(stretch) = stretch {
                settings.stretch = stretch;
            }

            let file = load(&input)?;
            let (file, graph) = pipeline::build_graph(file, &settings)?;
            info!("Drawing {} of {} lines", graph.visible.len(), graph.registry.len());

            match &output {
                Some(path) => {
                    let handle = File::create(path)
                        .with_context(|| format!("Failed to create {:?}", path))?;
                    let mut writer = BufWriter::new(handle);
                    dot_writer::write_dot(&mut writer, &file, &graph, settings.stretch)?;
                    writer.flush()?;
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut writer = BufWriter::new(stdout.lock());
                    dot_writer::write_dot(&mut writer, &file, &graph, settings.stretch)?;
                    writer.flush()?;
                }
            }
        }
        Command::Convert { input, output } => {
            let file = load(&input)?;
            file.save(&output)
                .with_context(|| format!("Failed to write {:?}", output))?;
            println!("Wrote {:?}", output);
        }
    }

    Ok(())
}
