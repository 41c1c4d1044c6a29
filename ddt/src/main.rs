use anyhow::{Context, Result};
use clap::Parser;
use ddt_container::{NullSerializer, Serializer, TileContainer};
use ddt_core::{ConcurrencyLimits, SchedulerKind};
use ddt_engine::{DistributedTriangulation, Scheduler};
use ddt_io::{FilePointSerializer, GridPartitioner, RandomPointGenerator};
use ddt_kernel::Bbox;
use std::path::PathBuf;

/// Builds a distributed Delaunay triangulation out of a generated point set
/// and optionally checks, serializes or exports it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// After construction, call `is_valid(true, 5)` and print OK/ERROR!
	#[arg(long)]
	check: bool,

	/// Number of random points to generate.
	#[arg(short = 'p', long, default_value_t = 1000)]
	points: usize,

	/// Log verbosity, 0 (errors only) through 4 (trace).
	#[arg(short = 'l', long, default_value_t = 2)]
	log: u8,

	/// Worker count for the threaded/message-passing schedulers; 0 = auto.
	#[arg(short = 'j', long = "max-concurrency", default_value_t = 0)]
	max_concurrency: usize,

	/// Tile grid dimensions, one integer per axis (e.g. `-t 3 -t 3` for 3x3).
	#[arg(short = 't', long, num_args = 1.., default_value = "2")]
	tiles: Vec<usize>,

	/// Half-side of the point generation cube.
	#[arg(short = 'r', long, default_value_t = 1.0)]
	range: f64,

	/// Tile file prefix; enables the file-backed serializer when set.
	#[arg(short = 's', long)]
	serialize: Option<PathBuf>,

	/// VRT+CSV output directory basename.
	#[arg(long)]
	vrt: Option<PathBuf>,

	/// PLY output basename.
	#[arg(long)]
	ply: Option<PathBuf>,

	/// VTU+PVTU output basename.
	#[arg(long)]
	vtu: Option<PathBuf>,

	/// GeoJSON output path.
	#[arg(long)]
	geojson: Option<PathBuf>,

	/// Resident tile cap; 0 = unlimited.
	#[arg(short = 'm', long, default_value_t = 0)]
	memory: usize,

	/// Ambient dimension.
	#[arg(short = 'd', long, default_value_t = 2)]
	dimension: usize,

	/// Which scheduler drives tile traversal.
	#[arg(long, default_value = "sequential")]
	scheduler: String,
}

fn main() -> Result<()> {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			let _ = e.print();
			let code = match e.kind() {
				clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
				_ => -1,
			};
			std::process::exit(code);
		}
	};

	env_logger::Builder::new().filter_level(log_level(cli.log)).format_timestamp(None).init();

	match run(&cli) {
		Ok(valid) => {
			if cli.check && !valid {
				std::process::exit(1);
			}
			Ok(())
		}
		Err(e) => Err(e),
	}
}

fn log_level(verbosity: u8) -> log::LevelFilter {
	match verbosity {
		0 => log::LevelFilter::Error,
		1 => log::LevelFilter::Warn,
		2 => log::LevelFilter::Info,
		3 => log::LevelFilter::Debug,
		_ => log::LevelFilter::Trace,
	}
}

/// Returns `Ok(true)` unless `--check` was requested and validation failed.
fn run(cli: &Cli) -> Result<bool> {
	let scheduler_kind: SchedulerKind = cli.scheduler.parse()?;
	let concurrency = ConcurrencyLimits::from_flag(cli.max_concurrency);
	let scheduler = Scheduler::new(scheduler_kind, concurrency);

	let mut generator = RandomPointGenerator::new(cli.dimension, cli.range, 0);
	let points = generator.generate(cli.points);

	let mut bbox = Bbox::empty(cli.dimension);
	for p in &points {
		bbox.extend(p);
	}
	let grid = if cli.tiles.len() == 1 { vec![cli.tiles[0]; cli.dimension] } else { cli.tiles.clone() };
	let partitioner = GridPartitioner::new(bbox, grid);

	let valid = if let Some(prefix) = &cli.serialize {
		let memory_cap = if cli.memory == 0 { None } else { Some(cli.memory) };
		let serializer = FilePointSerializer::new(prefix);
		let dt = DistributedTriangulation::new(cli.dimension, memory_cap, serializer, scheduler);
		dt.insert(points, &partitioner).context("inserting points")?;
		let valid = finish(&dt, cli)?;
		dt.save_all().context("saving tiles")?;
		valid
	} else {
		let dt = DistributedTriangulation::new(cli.dimension, None, NullSerializer, scheduler);
		dt.insert(points, &partitioner).context("inserting points")?;
		finish(&dt, cli)?
	};

	Ok(valid)
}

fn finish<S: Serializer>(dt: &DistributedTriangulation<S>, cli: &Cli) -> Result<bool> {
	let valid = if cli.check {
		let ok = dt.is_valid(true, 5).context("checking validity")?;
		println!("{}", if ok { "OK" } else { "ERROR!" });
		ok
	} else {
		true
	};

	write_outputs(dt, cli)?;
	Ok(valid)
}

fn write_outputs<S: Serializer>(dt: &DistributedTriangulation<S>, cli: &Cli) -> Result<()> {
	let container: &TileContainer<S> = dt.container();
	if let Some(basename) = &cli.ply {
		ddt_io::write_ply(container, basename).context("writing PLY output")?;
	}
	if let Some(basename) = &cli.vtu {
		ddt_io::write_vtu_pvtu(container, basename).context("writing VTU/PVTU output")?;
	}
	if let Some(root) = &cli.vrt {
		ddt_io::write_vrt_csv(container, root).context("writing VRT/CSV output")?;
	}
	if let Some(path) = &cli.geojson {
		ddt_io::write_geojson(container, path).context("writing GeoJSON output")?;
	}
	Ok(())
}
