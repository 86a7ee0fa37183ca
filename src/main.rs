use std::fs;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use minipy::interpreter::Interpreter;
use minipy::parser;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let source = match args.next() {
        Some(path) => {
            if args.next().is_some() {
                bail!("Only one input file is supported");
            }
            fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    let program = parser::parse_source(&source)?;
    let output = Interpreter::new().run(&program)?;
    print!("{output}");
    Ok(())
}
