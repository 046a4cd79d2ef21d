use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use stitch::expand::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_REPLACEMENTS};
use stitch::fs_utils::{include_base_dir, read_file_contents, resolve_include_path};
use stitch::{
    Directive, DirectivePattern, ExpandConfig, Expansion, Result, StitchError, expand_file,
    expand_str, list_directives,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

const LONG_HELP: &str = r#"
Directives:
  A directive is LEFT_MATCH, a path made of word characters and . , /
  then RIGHT_MATCH. Both delimiters are regular expressions. Paths resolve
  relative to the file containing the directive.

Examples:
  # C-style includes, printed to stdout
  stitch index.txt '#include\( *' ' *\)'
  # HTML comment includes, written to a file
  stitch page.html '<!-- *include\(' '\) *-->' -o out.html
  # Keep included lines at column zero
  stitch index.txt '#include\(' '\)' --noindent
  # Read the root document from stdin
  cat index.txt | stitch - '#include\(' '\)'
  # List directives in the root without expanding them
  stitch index.txt '#include\(' '\)' --list=json
  # Check that every include resolves, without writing output
  stitch index.txt '#include\(' '\)' --dry-run

Template example:
  int main() {
      #include(body.c)
  }
"#;

/// Recursive, syntax-agnostic file includer.
#[derive(Parser, Debug)]
#[command(
    name = "stitch",
    version,
    about = "Recursive, syntax-agnostic file includer.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Root document to expand. Use '-' for stdin.
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Regex fragment that opens an include directive
    #[arg(value_name = "LEFT_MATCH", allow_hyphen_values = true)]
    left_match: String,

    /// Regex fragment that closes an include directive
    #[arg(value_name = "RIGHT_MATCH", allow_hyphen_values = true)]
    right_match: String,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Don't re-indent multi-line includes
    #[arg(long)]
    noindent: bool,

    /// Maximum nesting of includes below the root document (0 for unlimited)
    #[arg(long, value_name = "N", env = "STITCH_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Maximum substitutions within one file (0 for unlimited)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_REPLACEMENTS)]
    max_replacements: usize,

    /// List directives in the root document (optionally with format: plain, detailed, json)
    #[arg(
        long,
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = "plain",
        conflicts_with_all = ["dry_run", "output"]
    )]
    list: Option<ListFormat>,

    /// Expand in memory and report included files without writing output
    #[arg(long, conflicts_with = "output")]
    dry_run: bool,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One include path per line
    Plain,
    /// Position and resolution details for each directive
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct DirectiveInfo {
    #[serde(flatten)]
    directive: Directive,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    exists: bool,
}

/// Root document and the directory its directives resolve against
struct Root {
    text: String,
    base_dir: PathBuf,
    path: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    let pattern = DirectivePattern::new(&cli.left_match, &cli.right_match)?;
    debug!(pattern = pattern.as_str(), "compiled directive pattern");

    if let Some(format) = cli.list {
        let root = load_root(&cli.input_file)?;
        print_directives(&root, &pattern, format)?;
        return Ok(0);
    }

    let config = ExpandConfig {
        indent: !cli.noindent,
        max_depth: (cli.max_depth > 0).then_some(cli.max_depth),
        max_replacements: (cli.max_replacements > 0).then_some(cli.max_replacements),
    };

    let expansion = if is_stdin(&cli.input_file) {
        let root = load_root(&cli.input_file)?;
        expand_str(&root.text, &pattern, &root.base_dir, &config)?
    } else {
        info!("Expanding {}", cli.input_file.display());
        expand_file(&cli.input_file, &pattern, &config)?
    };

    if cli.dry_run {
        return Ok(report_dry_run(&expansion));
    }

    // Output is only touched once expansion has fully succeeded
    if let Some(output_path) = &cli.output {
        info!("Writing output to {}", output_path.display());
        std::fs::write(output_path, &expansion.text)?;
    } else {
        print!("{}", expansion.text);
        io::stdout().flush()?;
    }

    info!(
        "Expansion complete: {} includes, {} cycles",
        expansion.includes.len(),
        expansion.cycles.len()
    );
    Ok(0)
}

fn is_stdin(input: &Path) -> bool {
    input == Path::new("-")
}

fn load_root(input: &Path) -> Result<Root> {
    if is_stdin(input) {
        info!("Reading root document from stdin...");
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(Root {
            text,
            base_dir: std::env::current_dir()?,
            path: None,
        })
    } else {
        let path = input
            .canonicalize()
            .map_err(|_| StitchError::FileNotFound {
                path: input.to_path_buf(),
            })?;
        Ok(Root {
            text: read_file_contents(&path)?,
            base_dir: include_base_dir(&path),
            path: Some(path),
        })
    }
}

fn print_directives(root: &Root, pattern: &DirectivePattern, format: ListFormat) -> Result<()> {
    let directives = list_directives(&root.text, pattern);
    if let Some(path) = &root.path {
        debug!(
            "Found {} directives in {}",
            directives.len(),
            path.display()
        );
    }

    match format {
        ListFormat::Plain => {
            for directive in &directives {
                println!("{}", directive.path);
            }
        }
        ListFormat::Detailed => {
            for directive in &directives {
                println!("Directive: {}", &root.text[directive.span.clone()]);
                println!("  Path: {}", directive.path);
                println!(
                    "  Position: {}..{}",
                    directive.span.start, directive.span.end
                );
                match resolve_include_path(&directive.path, &root.base_dir) {
                    Ok(p) => {
                        println!("  Resolved: {}", p.display());
                        if p.is_file() {
                            println!("  Exists: yes");
                        } else {
                            println!("  Exists: no (not a file)");
                        }
                    }
                    Err(e) => {
                        println!("  Exists: no ({e})");
                    }
                }
                println!();
            }
        }
        ListFormat::Json => {
            let infos: Vec<DirectiveInfo> = directives
                .into_iter()
                .map(|directive| {
                    let resolved = resolve_include_path(&directive.path, &root.base_dir).ok();
                    DirectiveInfo {
                        exists: resolved.as_deref().is_some_and(Path::is_file),
                        resolved: resolved.map(|p| p.display().to_string()),
                        directive,
                    }
                })
                .collect();
            let json = serde_json::to_string_pretty(&infos)?;
            println!("{json}");
        }
    }

    Ok(())
}

fn report_dry_run(expansion: &Expansion) -> i32 {
    for path in &expansion.includes {
        info!("✓ {}", path.display());
    }

    println!(
        "Summary: {} includes resolved, {} bytes of output",
        expansion.includes.len(),
        expansion.text.len()
    );
    if expansion.cycles.is_empty() {
        return 0;
    }

    println!("  ✗ {} circular inclusions", expansion.cycles.len());
    for cycle in &expansion.cycles {
        println!(
            "    {} <- {}",
            cycle.path.display(),
            cycle.parent.display()
        );
    }
    2
}
