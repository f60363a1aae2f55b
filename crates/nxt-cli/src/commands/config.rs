//! Effective configuration dump

use super::ConnectionArgs;
use anyhow::Result;

pub fn execute(args: &ConnectionArgs) -> Result<()> {
    let config = args.load_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
