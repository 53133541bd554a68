use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlsplit::parameters::{ParameterKind, SqlQueryParameter};
use sqlsplit::splitter;
use sqlsplit::{DialectRegistry, ScriptElement, SplitOptions};

/// sqlsplit - split SQL scripts into statements and control commands.
#[derive(Parser, Debug)]
#[command(name = "sqlsplit", version, about)]
struct Cli {
    /// Files or directories to split. Use "-" to read from stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// SQL dialect: generic, postgres, oracle, sqlserver, mysql.
    #[arg(short = 'd', long)]
    dialect: Option<String>,

    /// Keep the terminating delimiter in query text.
    #[arg(long)]
    keep_delimiters: bool,

    /// Treat a blank line as a statement delimiter.
    #[arg(long)]
    blank_line_delimiter: bool,

    /// Print the parameters of every query.
    #[arg(long)]
    parameters: bool,

    /// Print only the element at this byte offset.
    #[arg(long, value_name = "OFFSET")]
    cursor: Option<usize>,

    /// Glob patterns to exclude.
    #[arg(long)]
    exclude: Vec<String>,

    /// Path to config file (sqlsplit.toml or pyproject.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "sqlsplit=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Returns false when some file could not be processed.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut options = sqlsplit::load_config(&cli.files, cli.config.as_deref())
        .context("configuration error")?;
    apply_cli(&mut options, &cli);

    let registry = DialectRegistry::with_builtin();
    let entry = registry.get(&options.dialect)?;

    let is_stdin = cli.files.len() == 1 && cli.files[0].to_string_lossy() == "-";
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if is_stdin {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("error reading stdin")?;
        let elements = sqlsplit::split_script(&source, &entry, &options);
        print_elements(&mut out, &source, &elements, &cli)?;
        return Ok(true);
    }

    let report = sqlsplit::run(&cli.files, &options)?;
    let show_headers = report.total() > 1;
    for result in &report.results {
        if result.error.is_some() {
            continue;
        }
        if show_headers {
            writeln!(out, "==> {} <==", result.path.display())?;
        }
        print_elements(&mut out, &result.source, &result.elements, &cli)?;
    }

    report.print_errors();
    if cli.verbose {
        eprintln!("{}", report.summary());
    }
    Ok(!report.has_errors())
}

/// Command-line flags override config file values.
fn apply_cli(options: &mut SplitOptions, cli: &Cli) {
    if let Some(ref dialect) = cli.dialect {
        options.dialect = dialect.clone();
    }
    options.keep_delimiters |= cli.keep_delimiters;
    options.blank_line_delimiter |= cli.blank_line_delimiter;
    options.parse_parameters |= cli.parameters;
    if !cli.exclude.is_empty() {
        options.exclude = cli.exclude.clone();
    }
}

fn print_elements(
    out: &mut impl Write,
    source: &str,
    elements: &[ScriptElement],
    cli: &Cli,
) -> io::Result<()> {
    if let Some(offset) = cli.cursor {
        if let Some(element) = splitter::element_at(source, elements, offset) {
            print_element(out, element, cli.parameters)?;
        }
        return Ok(());
    }
    for element in elements {
        print_element(out, element, cli.parameters)?;
    }
    Ok(())
}

fn print_element(out: &mut impl Write, element: &ScriptElement, parameters: bool) -> io::Result<()> {
    match element {
        ScriptElement::Query(query) => {
            writeln!(out, "query {}..{}", query.start, query.end())?;
            writeln!(out, "{}", query.text)?;
            if parameters {
                for parameter in &query.parameters {
                    writeln!(out, "  {}", describe_parameter(parameter))?;
                }
            }
        }
        ScriptElement::Control(control) => {
            write!(out, "control {}", control.command)?;
            if let Some(ref name) = control.parameter_name {
                write!(out, " name={}", name)?;
            }
            if let Some(ref value) = control.parameter_value {
                write!(out, " value={}", value)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn describe_parameter(parameter: &SqlQueryParameter) -> String {
    let kind = match parameter.kind {
        ParameterKind::Named => "named",
        ParameterKind::Anonymous => "anonymous",
        ParameterKind::Variable => "variable",
    };
    let mut line = format!(
        "param {} {} {} at {}",
        parameter.position, kind, parameter.name, parameter.offset
    );
    if let Some(previous) = parameter.previous {
        line.push_str(&format!(" (repeats {})", previous));
    }
    line
}
