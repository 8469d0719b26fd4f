use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use uel::{ElContext, Expr, Value};

/// Evaluate a Unified Expression Language (EL) template or expression.
///
/// The source is read from the SOURCE argument, or from stdin if it is omitted or `-`.
/// By default it is treated as a template such as `Hello ${user.name}!`; pass
/// `--expression` to parse it as a bare expression such as `user.age + 1`.
///
/// Variables can be loaded from a YAML or JSON file with `--vars` and defined on the
/// command line with `--var name=EXPR`, where EXPR is itself an EL expression:
///
///   uel-eval --var 'items=[1, 2, 3]' --expression 'items.size() * 2'
#[derive(Debug, Parser)]
#[command(name = "uel-eval", version)]
struct Args {
    /// A YAML or JSON file whose top level mapping defines variables. Files ending in
    /// `.json` are read as JSON, everything else as YAML.
    #[arg(long = "vars", value_name = "FILE")]
    vars: Option<PathBuf>,

    /// Define a variable as NAME=EXPR. May be given multiple times; later definitions
    /// can refer to earlier ones.
    #[arg(long = "var", value_name = "NAME=EXPR")]
    var: Vec<String>,

    /// Parse the source as a single expression instead of a template.
    #[arg(short = 'e', long = "expression", default_value_t = false)]
    expression: bool,

    /// The output format to use. Valid options are "plain", "json", "yaml" and "ast".
    /// Default is "plain".
    #[arg(long, short = 'o', default_value_t = Format::default())]
    output: Format,

    /// The template or expression to evaluate.
    #[arg(value_name = "SOURCE")]
    source: Option<String>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Format {
    #[default]
    Plain,
    Json,
    Yaml,
    /// Print the parsed tree instead of evaluating it
    Ast,
}

impl std::str::FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(Format::Plain),
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            "ast" => Ok(Format::Ast),
            _ => Err(anyhow::anyhow!("Unknown format: {}", s)),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Format::Plain => "plain",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Ast => "ast",
        };
        write!(f, "{}", s)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut ctx = ElContext::new();
    if let Some(path) = &args.vars {
        load_vars(&ctx, path).with_context(|| format!("reading {}", path.display()))?;
    }
    for definition in &args.var {
        define_var(&mut ctx, definition)
            .with_context(|| format!("defining variable from `{definition}`"))?;
    }

    let source = read_source(args.source.as_deref())?;
    let expr = if args.expression {
        uel::parse_expression(&ctx, &source)?
    } else {
        uel::parse(&ctx, &source)?
    };

    let mut stdout = std::io::stdout().lock();
    match args.output {
        Format::Ast => writeln!(stdout, "{:#?}", expr)?,
        Format::Plain => writeln!(stdout, "{}", evaluate(&mut ctx, &expr)?)?,
        Format::Json => {
            let value = evaluate(&mut ctx, &expr)?;
            serde_json::to_writer_pretty(&mut stdout, &value)
                .context("JSON serialization failed")?;
            writeln!(stdout)?;
        }
        Format::Yaml => {
            let value = evaluate(&mut ctx, &expr)?;
            serde_norway::to_writer(&mut stdout, &value).context("YAML serialization failed")?;
        }
    }

    Ok(())
}

fn evaluate(ctx: &mut ElContext, expr: &Expr) -> Result<Value> {
    log::debug!("evaluating {expr}");
    expr.get_value(ctx).context("evaluation failed")
}

fn read_source(source: Option<&str>) -> Result<String> {
    match source {
        Some(source) if source != "-" => Ok(source.to_string()),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading source from stdin")?;
            // a trailing newline from `echo` or a heredoc is not part of the template
            Ok(buf.strip_suffix('\n').unwrap_or(&buf).to_string())
        }
    }
}

/// Defines every entry of the file's top level mapping as a variable.
fn load_vars(ctx: &ElContext, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed: serde_json::Value = if is_json {
        serde_json::from_str(&contents)?
    } else {
        serde_norway::from_str(&contents)?
    };

    let serde_json::Value::Object(entries) = parsed else {
        anyhow::bail!("expected a mapping of variable names to values");
    };
    for (name, value) in entries {
        log::debug!("defining variable {name} from file");
        ctx.variables().define(name, Value::from(value));
    }
    Ok(())
}

/// Evaluates `NAME=EXPR` and defines NAME with the result.
fn define_var(ctx: &mut ElContext, definition: &str) -> Result<()> {
    let (name, source) = definition
        .split_once('=')
        .context("expected NAME=EXPR")?;
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "variable name is empty");

    let expr = uel::parse_expression(ctx, source)?;
    let value = evaluate(ctx, &expr)?;
    log::debug!("defining variable {name} = {value}");
    ctx.variables().define(name, value);
    Ok(())
}
