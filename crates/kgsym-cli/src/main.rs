//! Kgsym CLI
//!
//! Parses an infix expression or a LaTeX formula, mirrors it into the
//! knowledge graph and prints the resulting nodes.

use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use kgsym_ast::Expr;
use kgsym_convert::Converter;
use kgsym_graph::{BUILTINS_URI, Graph, ItemId, ItemSpec, MATH_MODULE_URI, ids};
use kgsym_parser::SymbolResolver;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Module holding the items created for a single invocation
const CLI_MODULE_URI: &str = "kgsym:/cli";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Infix(String),
    Latex(String),
}

#[derive(Debug, Clone)]
struct Options {
    input: Input,
    modules: Vec<String>,
    json: bool,
    roundtrip: bool,
    at: Vec<(String, f64)>,
    consistency: bool,
}

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let result = Options::from_matches(&matches).and_then(|options| run(&options));
    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    }
}

fn cli() -> Command {
    Command::new("kgsym")
        .version("0.1.0")
        .about("Symbolic expressions on an item/relation knowledge graph")
        .arg(
            Arg::new("expr")
                .short('e')
                .long("expr")
                .value_name("EXPR")
                .help("Infix expression, e.g. 'a + b*(a + c)'")
                .num_args(1),
        )
        .arg(
            Arg::new("latex")
                .short('l')
                .long("latex")
                .value_name("LATEX")
                .help("LaTeX formula, e.g. '\\frac{a}{b}'")
                .num_args(1),
        )
        .group(
            ArgGroup::new("input")
                .args(["expr", "latex"])
                .required(true),
        )
        .arg(
            Arg::new("module")
                .short('m')
                .long("module")
                .value_name("FILE")
                .help("Module definition file to load before converting")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the JSON export of the graph")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("roundtrip")
                .long("roundtrip")
                .help("Convert the graph back and print the expression")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("at")
                .long("at")
                .value_name("NAME=VALUE")
                .help("Evaluate numerically with NAME bound to VALUE")
                .value_parser(parse_binding)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("no-consistency")
                .long("no-consistency")
                .help("Skip consistency checking of new statements")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(ArgAction::Count),
        )
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("KGSYM_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_binding(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in '{text}'"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value in '{text}': {e}"))?;
    Ok((name.to_string(), value))
}

impl Options {
    fn from_matches(matches: &ArgMatches) -> Result<Self, anyhow::Error> {
        let input = match (
            matches.get_one::<String>("expr"),
            matches.get_one::<String>("latex"),
        ) {
            (Some(expr), None) => Input::Infix(expr.clone()),
            (None, Some(latex)) => Input::Latex(latex.clone()),
            _ => bail!("give exactly one of --expr or --latex"),
        };

        Ok(Self {
            input,
            modules: matches
                .get_many::<String>("module")
                .map(|paths| paths.cloned().collect())
                .unwrap_or_default(),
            json: matches.get_flag("json"),
            roundtrip: matches.get_flag("roundtrip"),
            at: matches
                .get_many::<(String, f64)>("at")
                .map(|bindings| bindings.cloned().collect())
                .unwrap_or_default(),
            consistency: !matches.get_flag("no-consistency"),
        })
    }
}

fn run(options: &Options) -> Result<String, anyhow::Error> {
    let mut graph = Graph::new();
    if !options.consistency {
        graph.disable_consistency_checking();
    }
    graph.load_math_module()?;
    for path in &options.modules {
        let uri = graph
            .load_module_from_path(path, None, true)
            .with_context(|| format!("loading module {path}"))?;
        info!(%uri, %path, "loaded module");
    }

    // Items of user modules can be named in the input by label or LaTeX
    let module_items: Vec<ItemId> = graph
        .modules()
        .filter(|module| module.uri != BUILTINS_URI && module.uri != MATH_MODULE_URI)
        .flat_map(|module| module.items().iter().copied())
        .collect();

    graph.start_module(CLI_MODULE_URI)?;
    let converter = Converter::new(&graph)?;

    let parsed = match &options.input {
        Input::Infix(text) => kgsym_parser::parse_expr(text)?,
        Input::Latex(latex) => kgsym_parser::parse_latex(latex)?,
    };
    let items = symbol_items(&converter, &mut graph, &parsed, module_items)?;
    let expr = converter.bind_symbols(&mut graph, &parsed, &items)?;
    let node = converter.expr_to_graph(&mut graph, &expr)?;
    debug!(%expr, node = graph.key(node).unwrap_or_default(), "converted input");

    let mut out = String::new();
    writeln!(out, "{expr}")?;
    out.push_str(&graph.describe(node));

    let back = converter.graph_to_expr(&graph, node)?;
    if options.roundtrip {
        writeln!(out, "roundtrip: {back}")?;
        writeln!(out, "roundtrip equal: {}", back == expr)?;
    }
    if !options.at.is_empty() {
        let bindings: HashMap<String, f64> = options.at.iter().cloned().collect();
        // bindings use the names written in the input
        writeln!(out, "value: {}", expr.evaluate(&bindings)?)?;
    }
    if options.json {
        writeln!(out, "{}", graph.to_json()?)?;
    }
    Ok(out)
}

/// Candidate items for `parsed`: `known` plus a new real number per free
/// symbol that none of them matches
fn symbol_items(
    converter: &Converter,
    graph: &mut Graph,
    parsed: &Expr,
    known: Vec<ItemId>,
) -> Result<Vec<ItemId>, anyhow::Error> {
    let resolver = SymbolResolver::new(converter.candidates(graph, &known)?);
    let mut missing = Vec::new();
    for symbol in parsed.free_symbols() {
        if symbol.key.is_none() && resolver.lookup(&symbol.name)?.is_none() {
            missing.push(symbol.name);
        }
    }

    let mut items = known;
    for name in missing {
        let id = graph.create_item(ItemSpec::new(name).instance_of(ids::REAL_NUMBER))?;
        items.push(id);
    }
    Ok(items)
}
