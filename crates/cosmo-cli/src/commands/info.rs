use std::error::Error;
use std::fmt::Write as _;

use clap::Args;
use cosmo_chain::ParameterClass;

use super::ChainArgs;

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub chain: ChainArgs,
}

fn bound(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}"))
}

pub fn run(args: &InfoArgs) -> Result<(), Box<dyn Error>> {
    let (_, chain) = args.chain.open()?;
    let mut out = String::new();
    writeln!(out, "chain   {}", chain.name())?;
    writeln!(out, "format  {}", chain.format())?;
    writeln!(out, "files   {}", chain.files().len())?;
    writeln!(out, "rows    {}", chain.len())?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<20} {:<22} {:>12} {:>12} {:>12} {:>12}  label",
        "parameter", "class", "lower", "upper", "min", "max"
    )?;
    for name in chain.parameters() {
        let class = chain.catalog().class_of(&name)?;
        let (lower, upper) = match class {
            ParameterClass::Derived => (None, None),
            _ => chain.bounds_of(&name)?,
        };
        let class = serde_json::to_value(class)?;
        writeln!(
            out,
            "{:<20} {:<22} {:>12} {:>12} {:>12.6} {:>12.6}  {}",
            name,
            class.as_str().unwrap_or_default(),
            bound(lower),
            bound(upper),
            chain.min(&name)?,
            chain.max(&name)?,
            chain.label_of(&name)?,
        )?;
    }
    print!("{out}");
    Ok(())
}
