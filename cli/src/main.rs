use std::env;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use lexparse::{symbols, ChartDecoder, DecoderConfig, EnglishRules, Err, Params};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} MODEL_PREFIX [options]

Reads one tokenized sentence per line from stdin and prints its best parse.

Options:
  -h, --help          Print this message
  -p, --params FILE   Read decoder settings from a parameter file
  -c, --chart         Print the parse chart (defaults to not printing)
  -a, --all           Print every returned parse, not only the best
  -n, --np            Collapse NP-type labels to NP",
    prog_name
  )
}

struct Args {
  model: String,
  params: Option<String>,
  print_chart: bool,
  print_all: bool,
  collapse_np_labels: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "lexparse"));
    };

    let mut model: Option<String> = None;
    let mut params: Option<String> = None;
    let mut print_chart = false;
    let mut print_all = false;
    let mut collapse_np_labels = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-p" || o == "--params" {
        match iter.next() {
          Some(file) => params = Some(file),
          None => return Err(Self::make_error_message("--params needs a file", prog_name)),
        }
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-a" || o == "--all" {
        print_all = true;
      } else if o == "-n" || o == "--np" {
        collapse_np_labels = true;
      } else if model.is_none() {
        model = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    match model {
      Some(model) => Ok(Self {
        model,
        params,
        print_chart,
        print_all,
        collapse_np_labels,
      }),
      None => Err(Self::make_error_message("missing model prefix", prog_name)),
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexparse=info")))
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let params = match &opts.params {
    Some(file) => Params::read_file(file)?,
    None => Params::default(),
  };
  let config = DecoderConfig::from_params(&params)?;
  let cache_dir = config.cache_dir.clone();
  let mut decoder = ChartDecoder::load(&opts.model, config, Arc::new(EnglishRules::new()))?;
  info!(model = %opts.model, "model loaded");

  let stdout = io::stdout();
  let mut out = stdout.lock();
  for line in io::stdin().lock().lines() {
    let line = line?;
    let sentence = symbols(line.trim());
    let decoded = decoder.decode(&sentence, &[], opts.collapse_np_labels);

    if opts.print_chart {
      writeln!(out, "chart:\n{}", decoder.chart_display())?;
    }
    if opts.print_all {
      for (i, parse) in decoded.parses.iter().enumerate() {
        let marker = if i == decoded.best { "*" } else { " " };
        writeln!(out, "{} {:.4} {}", marker, decoded.scores[i], parse)?;
      }
    } else {
      writeln!(out, "{}", decoded.best_parse())?;
    }
    out.flush()?;
  }

  if let Some(dir) = cache_dir {
    decoder.write_caches(&dir)?;
    info!(dir = %dir.display(), "probability caches saved");
  }
  Ok(())
}
