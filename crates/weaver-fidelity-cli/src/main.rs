use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, WrapErr};
use weaver_fidelity::{
    DocumentModel, FidelityConfig, FidelityEditor, MarkdownConverter, Representation,
    find_all_matches, map_position,
};

mod config;

#[derive(Parser)]
#[command(version, about = "Weaver fidelity - inspect markdown the way the structured editor sees it", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a KDL config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum View {
    Markdown,
    Structured,
}

impl From<View> for Representation {
    fn from(view: View) -> Self {
        match view {
            View::Markdown => Representation::Markdown,
            View::Structured => Representation::Structured,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and re-serialize a file, report whether it round-trips
    ///
    /// Backslash escapes the structured view does not need are not kept, so
    /// a file that only differs by those still passes.
    Check {
        file: PathBuf,
    },
    /// List matches of a query
    Search {
        file: PathBuf,
        query: String,

        #[arg(long, value_enum, default_value = "markdown")]
        view: View,
    },
    /// Replace every match of a query
    Replace {
        file: PathBuf,
        query: String,
        replacement: String,

        #[arg(long, value_enum, default_value = "markdown")]
        view: View,

        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// Map a caret offset into the other view
    Map {
        file: PathBuf,
        offset: usize,

        /// View the offset refers to
        #[arg(long, value_enum, default_value = "markdown")]
        from: View,
    },
    /// Place the caret in the structured view and show the revealed delimiters
    Reveal {
        file: PathBuf,
        caret: usize,
    },
}

fn main() -> Result<()> {
    init_miette()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { file } => check(&file, config),
        Commands::Search { file, query, view } => search(&file, &query, view, config),
        Commands::Replace {
            file,
            query,
            replacement,
            view,
            write,
        } => replace(&file, &query, &replacement, view, write, config),
        Commands::Map { file, offset, from } => map(&file, offset, from, config),
        Commands::Reveal { file, caret } => reveal(&file, caret, config),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn check(path: &Path, config: FidelityConfig) -> Result<()> {
    let markdown = read(path)?;
    let mut editor = FidelityEditor::with_config(&markdown, config);
    let serialized = editor.to_markdown()?;

    if serialized == markdown {
        println!("✓ {} round-trips", path.display());
        return Ok(());
    }
    let converter = editor.converter();
    if converter.parse(&serialized) == converter.parse(&markdown) {
        println!("✓ {} round-trips with redundant escapes dropped", path.display());
        return Ok(());
    }

    let (line, (original, output)) = markdown
        .lines()
        .zip(serialized.lines())
        .enumerate()
        .find(|(_, (a, b))| a != b)
        .unwrap_or((markdown.lines().count().min(serialized.lines().count()), ("", "")));
    println!("✗ {} does not round-trip", path.display());
    println!("  line {}:", line + 1);
    println!("  - {original}");
    println!("  + {output}");
    Err(miette::miette!("round trip changed {}", path.display()))
}

fn search(path: &Path, query: &str, view: View, config: FidelityConfig) -> Result<()> {
    let markdown = read(path)?;
    let text = match view {
        View::Markdown => markdown,
        View::Structured => FidelityEditor::with_config(&markdown, config.clone())
            .document()
            .text(),
    };
    let chars: Vec<char> = text.chars().collect();
    let matches = find_all_matches(&text, query, &config.search);
    for range in &matches {
        let found: String = chars[range.clone()].iter().collect();
        println!("{}..{}\t{found}", range.start, range.end);
    }
    tracing::debug!(count = matches.len(), ?view, "search finished");
    if matches.is_empty() {
        println!("no matches");
    }
    Ok(())
}

fn replace(
    path: &Path,
    query: &str,
    replacement: &str,
    view: View,
    write: bool,
    config: FidelityConfig,
) -> Result<()> {
    let markdown = read(path)?;
    let mut editor = FidelityEditor::with_config(&markdown, config);
    let count = match view {
        View::Markdown => editor.replace_all_in_source(query, replacement)?,
        View::Structured => editor.replace_all(query, replacement)?,
    };
    let output = editor.to_markdown()?;

    if write {
        std::fs::write(path, &output)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", path.display()))?;
        println!("replaced {count} match(es) in {}", path.display());
    } else {
        print!("{output}");
        eprintln!("replaced {count} match(es)");
    }
    Ok(())
}

fn map(path: &Path, offset: usize, from: View, config: FidelityConfig) -> Result<()> {
    let markdown = read(path)?;
    let editor = FidelityEditor::with_config(&markdown, config.clone());
    let structured = editor.document().text();

    let mapped = map_position(
        from.into(),
        offset,
        &structured,
        &markdown,
        &config.mapping,
    );
    match mapped.anchor {
        Some(anchor) => println!(
            "{offset} -> {} (key {} chars, {} candidate(s))",
            mapped.offset, anchor.key_len, anchor.candidates
        ),
        None => println!("{offset} -> {} (unanchored)", mapped.offset),
    }
    Ok(())
}

fn reveal(path: &Path, caret: usize, config: FidelityConfig) -> Result<()> {
    let markdown = read(path)?;
    let mut editor = FidelityEditor::with_config(&markdown, config);
    editor.move_caret(caret)?;

    let doc = editor.document();
    println!("{}", doc.text());
    match editor.reveal() {
        Some(state) => {
            println!(
                "revealed {:?} at {}..{} (inner {:?}, parses as {:?})",
                state.kind,
                state.start,
                state.end,
                state.inner_range(),
                state.semantic
            );
        }
        None => println!("nothing revealed at {caret}"),
    }
    if let Some(caret) = doc.caret() {
        println!("caret {caret}");
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    Ok(())
}
