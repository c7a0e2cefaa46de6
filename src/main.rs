//! File-mode driver: parse a binding program, evaluate one binding, print
//! its normal form.

use apeval::arena::Graph;
use apeval::engine::{eval, unparse_with, EvalContext, PrintOptions};
use apeval::error::EvalError;
use apeval::parser;
use apeval::trace::StepTrace;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "apeval")]
#[command(about = "Evaluate a binding from a combinator expression program", long_about = None)]
struct Args {
    /// File with binding definitions, one `name = expression` per line.
    #[arg(long)]
    input_file: PathBuf,

    /// Name of the binding to evaluate (e.g. `:1`).
    #[arg(long)]
    evaluate: Option<String>,

    /// Reducer step cap; 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    max_steps: usize,

    /// Stream every reduction step to stderr.
    #[arg(long)]
    print_steps: bool,

    /// Print re-encountered shared subtrees as `{#id}`.
    #[arg(long)]
    show_sharing: bool,

    /// Prefix lambdas, closures and applications with their node id.
    #[arg(long)]
    print_addr: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let text = std::fs::read_to_string(&args.input_file)?;
    let mut g = Graph::new();
    let mut parser = parser::Parser::new();
    parser.parse(&mut g, &text)?;
    eprintln!(
        "parse finished: {} bindings, {} leaf nodes, {} recursive definitions",
        parser.bindings.len(),
        parser.leaf_count,
        parser.recursive_count
    );

    let Some(name) = &args.evaluate else {
        return Ok(());
    };
    let root = parser
        .binding(name)
        .ok_or_else(|| EvalError::UnknownBinding(name.clone()))?;

    let mut trace = StepTrace::new(false, args.print_steps);
    let mut ctx = EvalContext::new(&parser.bindings);
    ctx.step_limit = args.max_steps;
    if args.print_steps {
        ctx.trace = Some(&mut trace);
    }
    let result = eval(&mut g, root, &mut ctx)?;

    let opts = PrintOptions {
        show_sharing: args.show_sharing,
        print_addr: args.print_addr,
    };
    println!("{}", unparse_with(&g, result, opts));
    Ok(())
}
