#![warn(clippy::all)]

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_t, App, Arg, ArgMatches};
use log::info;
use permutohedral_algorithms::{LatticeFilter, PreloadedLattice};
use permutohedral_core::{nalgebra::DMatrix, FilterOptions, KernelSelection, PreloadMixing};

struct Args {
    pub input_file: PathBuf,
    pub query_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub dimensions: usize,
    pub blur: bool,
    pub options: FilterOptions,
}

fn read_options(path: &Path) -> Result<FilterOptions> {
    let file = File::open(path)
        .with_context(|| format!("Could not open options file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Could not parse options file {}", path.display()))
}

fn apply_flags(mut options: FilterOptions, matches: &ArgMatches) -> Result<FilterOptions> {
    if matches.is_present("REVERSE") {
        options.reverse = true;
    }
    if matches.is_present("NORMALIZE") {
        options.normalize = true;
    }
    if matches.is_present("SIGMA") {
        options.sigma = value_t!(matches, "SIGMA", f32)?;
    }
    if let Some(kernel) = matches.value_of("KERNEL") {
        options.kernel = match kernel {
            "auto" => KernelSelection::Auto,
            "scalar" => KernelSelection::Scalar,
            "wide" => KernelSelection::Wide,
            other => bail!("Unknown kernel {}", other),
        };
    }
    if let Some(mixing) = matches.value_of("MIXING") {
        options.mixing = match mixing {
            "corrected" => PreloadMixing::Corrected,
            "reference" => PreloadMixing::Reference,
            other => bail!("Unknown mixing mode {}", other),
        };
    }
    options.validate()?;
    Ok(options)
}

fn get_args() -> Result<Args> {
    let matches = App::new("lattice-filter")
    .version("0.1")
    .about("Gaussian filtering of ASCII sample files on the permutohedral lattice")
    .arg(Arg::with_name("INPUT").short("i").takes_value(true).value_name("INPUT").help("Reference samples. One sample per line: the feature columns followed by the value columns, separated by whitespace").required(true))
    .arg(Arg::with_name("QUERIES").short("q").takes_value(true).value_name("QUERIES").help("Query positions. If given, the lattice is built from INPUT and evaluated at these positions instead of at the reference samples"))
    .arg(Arg::with_name("OUTPUT").short("o").takes_value(true).value_name("OUTPUT").help("Output file. Writes to stdout if omitted"))
    .arg(Arg::with_name("DIMENSIONS").short("d").takes_value(true).value_name("DIMENSIONS").help("Number of feature columns").required(true))
    .arg(Arg::with_name("BLUR").long("blur").help("Blur the lattice"))
    .arg(Arg::with_name("REVERSE").long("reverse").help("Blur the axes in reverse order"))
    .arg(Arg::with_name("NORMALIZE").long("normalize").help("Divide the filtered values by the filtered sample weight"))
    .arg(Arg::with_name("SIGMA").long("sigma").takes_value(true).value_name("SIGMA").help("Standard deviation of the Gaussian in feature units"))
    .arg(Arg::with_name("KERNEL").long("kernel").takes_value(true).possible_values(&["auto", "scalar", "wide"]).help("Compute kernel"))
    .arg(Arg::with_name("MIXING").long("mixing").takes_value(true).possible_values(&["corrected", "reference"]).help("Neighbor mixing of the preloaded lattice"))
    .arg(Arg::with_name("OPTIONS").long("options").takes_value(true).value_name("OPTIONS").help("JSON file with filter options. Flags given on the command line take precedence"))
    .get_matches();

    let base_options = match matches.value_of("OPTIONS") {
        Some(path) => read_options(Path::new(path))?,
        None => FilterOptions::default(),
    };

    Ok(Args {
        input_file: matches
            .value_of("INPUT")
            .ok_or_else(|| anyhow!("Missing input file"))?
            .into(),
        query_file: matches.value_of("QUERIES").map(PathBuf::from),
        output_file: matches.value_of("OUTPUT").map(PathBuf::from),
        dimensions: value_t!(matches, "DIMENSIONS", usize)?,
        blur: matches.is_present("BLUR"),
        options: apply_flags(base_options, &matches)?,
    })
}

/// Parses whitespace-separated rows of numbers. Empty lines and lines starting with `#` are skipped.
fn parse_rows<R: BufRead>(reader: R) -> Result<DMatrix<f32>> {
    let mut data = vec![];
    let mut columns = None;
    let mut rows = 0;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| token.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid number in line {}", line_number + 1))?;
        match columns {
            None => columns = Some(row.len()),
            Some(expected) if expected != row.len() => bail!(
                "Line {} has {} columns, expected {}",
                line_number + 1,
                row.len(),
                expected
            ),
            Some(_) => {}
        }
        data.extend(row);
        rows += 1;
    }
    Ok(DMatrix::from_row_slice(rows, columns.unwrap_or(0), &data))
}

fn read_rows(path: &Path) -> Result<DMatrix<f32>> {
    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
    parse_rows(BufReader::new(file)).with_context(|| format!("Could not read {}", path.display()))
}

/// Splits a sample matrix into its first `dimensions` feature columns and the remaining value columns
fn split_samples(samples: &DMatrix<f32>, dimensions: usize) -> Result<(DMatrix<f32>, DMatrix<f32>)> {
    if samples.nrows() > 0 && samples.ncols() < dimensions {
        bail!(
            "Samples have {} columns, but {} feature dimensions were requested",
            samples.ncols(),
            dimensions
        );
    }
    let dimensions = dimensions.min(samples.ncols());
    let features = samples.columns(0, dimensions).into_owned();
    let values = samples
        .columns(dimensions, samples.ncols() - dimensions)
        .into_owned();
    Ok((features, values))
}

fn write_rows<W: Write>(mut writer: W, rows: &DMatrix<f32>) -> Result<()> {
    for row in rows.row_iter() {
        let line = row
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

fn run(args: &Args) -> Result<DMatrix<f32>> {
    let samples = read_rows(&args.input_file)?;
    let (features, values) = split_samples(&samples, args.dimensions)?;
    info!(
        "Read {} reference samples with {} values each",
        features.nrows(),
        values.ncols()
    );

    match &args.query_file {
        Some(query_file) => {
            let queries = read_rows(query_file)?;
            let (queries, _) = split_samples(&queries, args.dimensions)?;
            let mut lattice = PreloadedLattice::new(args.dimensions, args.options)?;
            lattice.build(&features, &values, args.blur)?;
            info!("Lattice has {} vertices", lattice.lattice_size());
            let out = lattice.apply_par(&queries)?;
            info!("Evaluated {} queries", queries.nrows());
            Ok(out)
        }
        None => {
            let mut filter = LatticeFilter::new(args.dimensions, args.options)?;
            let out = filter.filter(&features, &values, args.blur)?;
            info!("Lattice has {} vertices", filter.lattice_size());
            Ok(out)
        }
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let out = run(&args)?;

    match &args.output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Could not create {}", path.display()))?;
            write_rows(BufWriter::new(file), &out)?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_rows(stdout.lock(), &out)?;
        }
    }

    Ok(())
}
