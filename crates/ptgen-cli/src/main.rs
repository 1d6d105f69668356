use anyhow::Context as _;
use clap::Parser;
use ptgen::{
    build::{Config, LalrOutput, Ll1Output},
    grammar::Grammar,
};
use ptgen_runtime::{
    definition::{SemanticError, Semantics},
    Boundary, Composite, LalrParser, PredictiveParser,
};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The grammar file to build the LL(1) table from
    #[arg(long)]
    ll1: Option<PathBuf>,

    /// The grammar file to build the LALR(1) table from
    #[arg(long)]
    lalr: Option<PathBuf>,

    /// The directory to write the dumps to (defaults to the grammar's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail when the LALR(1) table has conflicts
    #[arg(long)]
    deny_conflicts: bool,

    /// The LL(1) nonterminal whose bracketed segment is parsed by the LALR(1) table
    #[arg(long, requires_all = ["open", "close", "ll1", "lalr"])]
    delegate: Option<String>,

    /// The opening bracket of the delegated segment
    #[arg(long)]
    open: Option<String>,

    /// The closing bracket of the delegated segment
    #[arg(long)]
    close: Option<String>,

    /// Validate a whitespace-separated token string against the built tables
    #[arg(long)]
    parse: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::trace!("CLI args = {:?}", args);

    if args.ll1.is_none() && args.lalr.is_none() {
        anyhow::bail!("no grammar is specified; use --ll1 and/or --lalr");
    }

    let mut config = Config::new();
    config.deny_conflicts(args.deny_conflicts);

    let ll1 = match &args.ll1 {
        Some(path) => {
            let (grammar, output) = build_ll1(&config, path)?;
            write_dump(
                &args,
                path,
                "ll1",
                format!(
                    "{}\n{}\n## table:\n{}\n## summary:\n{}",
                    grammar,
                    output.sets.display(&grammar),
                    output.table.display(&grammar),
                    output.summary,
                ),
            )?;
            Some((grammar, output))
        }
        None => None,
    };

    let lalr = match &args.lalr {
        Some(path) => {
            let (grammar, output) = build_lalr(&config, path)?;
            write_dump(
                &args,
                path,
                "lalr",
                format!(
                    "{}\n{}\n## summary:\n{}",
                    grammar,
                    output.table.display(&grammar),
                    output.summary,
                ),
            )?;
            Some((grammar, output))
        }
        None => None,
    };

    let Some(input) = &args.parse else {
        return Ok(());
    };
    let tokens: Vec<&str> = input.split_whitespace().collect();

    if let (Some(delegate), Some((ll1_grammar, ll1)), Some((lalr_grammar, lalr))) =
        (&args.delegate, &ll1, &lalr)
    {
        let boundary = Boundary {
            nonterminal: ll1_grammar
                .nonterminal(delegate)
                .with_context(|| anyhow::anyhow!("unknown nonterminal `{}'", delegate))?,
            open: resolve_terminal(ll1_grammar, args.open.as_deref())?,
            close: resolve_terminal(ll1_grammar, args.close.as_deref())?,
        };
        let composite = Composite::new(
            PredictiveParser::new(ll1.table.definition(ll1_grammar)),
            LalrParser::new(lalr.table.definition(lalr_grammar))
                .context("preparing the LALR(1) machine")?,
            boundary,
        );
        let start = Instant::now();
        composite
            .parse(tokens.iter().copied(), Echo)
            .context("validating the input with the composite machine")?;
        tracing::info!("validated the input in {:?}", start.elapsed());
        println!("accepted");
        return Ok(());
    }

    if let Some((grammar, ll1)) = &ll1 {
        PredictiveParser::new(ll1.table.definition(grammar))
            .parse(tokens.iter().copied(), Echo)
            .context("validating the input with the LL(1) machine")?;
        println!("accepted by the LL(1) machine");
    }
    if let Some((grammar, lalr)) = &lalr {
        LalrParser::new(lalr.table.definition(grammar))
            .context("preparing the LALR(1) machine")?
            .parse(tokens.iter().copied(), Echo)
            .context("validating the input with the LALR(1) machine")?;
        println!("accepted by the LALR(1) machine");
    }

    Ok(())
}

fn build_ll1(config: &Config, path: &Path) -> anyhow::Result<(Grammar, Ll1Output)> {
    let start = Instant::now();
    let grammar = Grammar::from_file(path)
        .with_context(|| anyhow::anyhow!("reading the grammar {}", path.display()))?;
    tracing::info!("read {} in {:?}", path.display(), start.elapsed());

    let start = Instant::now();
    let output = config
        .build_ll1(&grammar)
        .with_context(|| anyhow::anyhow!("building the LL(1) table of {}", path.display()))?;
    tracing::info!("built the LL(1) table in {:?}", start.elapsed());

    Ok((grammar, output))
}

fn build_lalr(config: &Config, path: &Path) -> anyhow::Result<(Grammar, LalrOutput)> {
    let start = Instant::now();
    let grammar = Grammar::from_file(path)
        .with_context(|| anyhow::anyhow!("reading the grammar {}", path.display()))?;
    tracing::info!("read {} in {:?}", path.display(), start.elapsed());

    let start = Instant::now();
    let output = config
        .build_lalr(&grammar)
        .with_context(|| anyhow::anyhow!("building the LALR(1) table of {}", path.display()))?;
    tracing::info!(
        "built the LALR(1) table ({} states) in {:?}",
        output.table.states.len(),
        start.elapsed()
    );
    if !output.table.is_lalr1() {
        for conflict in &output.table.conflicts {
            eprintln!("{}", conflict.display(&grammar));
        }
    }

    Ok((grammar, output))
}

fn resolve_terminal(
    grammar: &Grammar,
    name: Option<&str>,
) -> anyhow::Result<ptgen::grammar::TerminalID> {
    let name = name.context("missing --open/--close")?;
    grammar
        .terminal(name)
        .with_context(|| anyhow::anyhow!("unknown terminal `{}'", name))
}

fn write_dump(args: &Args, grammar_path: &Path, extension: &str, dump: String) -> anyhow::Result<()> {
    let grammar_path = fs::canonicalize(grammar_path)
        .with_context(|| anyhow::anyhow!("failed to canonicalize {}", grammar_path.display()))?;
    let out_file = match &args.output {
        Some(dir) => {
            fs::create_dir_all(dir).context("creating the output directory")?;
            let name = grammar_path
                .file_name()
                .context("the grammar path has no file name")?;
            dir.join(name).with_extension(extension)
        }
        None => grammar_path.with_extension(extension),
    };
    fs::write(&out_file, dump)
        .with_context(|| anyhow::anyhow!("writing {}", out_file.display()))?;
    tracing::info!("wrote {}", out_file.display());
    Ok(())
}

/// Print every event of the machines.
struct Echo;

impl<'a> Semantics<&'a str> for Echo {
    fn shift(&mut self, token: &&'a str) -> Result<(), SemanticError> {
        println!("shift {}", token);
        Ok(())
    }

    fn reduce(&mut self, left: &str) -> Result<(), SemanticError> {
        println!("reduce {}", left);
        Ok(())
    }

    fn action(&mut self, name: &str, operands: &[&'a str]) -> Result<(), SemanticError> {
        println!("action @{} {:?}", name, operands);
        Ok(())
    }
}
