//! `stepwise keys`: prints the effective control bindings.

use anyhow::Result;
use stepwise_config::{into_control_keys, StepwiseConfig};

use crate::console;

pub fn run(config: &StepwiseConfig, json: bool) -> Result<()> {
    let controls = into_control_keys(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&controls)?);
    } else {
        print!("{}", console::render_bindings(&controls));
    }
    Ok(())
}
