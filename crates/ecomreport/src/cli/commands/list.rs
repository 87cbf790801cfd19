use anyhow::Result;
use clap::Args;

use crate::catalogue::{StepDescriptor, catalogue};

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &ListArgs) -> Result<()> {
    if args.json {
        let entries = catalogue()
            .iter()
            .map(|descriptor| {
                serde_json::json!({
                    "id": descriptor.id.as_str(),
                    "mode": descriptor.mode.as_str(),
                    "title": descriptor.title,
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string(&entries)?);
    } else {
        println!("{}", render_catalogue(catalogue()));
    }
    Ok(())
}

#[must_use]
pub fn render_catalogue(descriptors: &[StepDescriptor]) -> String {
    let id_width = descriptors
        .iter()
        .map(|descriptor| descriptor.id.as_str().len())
        .max()
        .unwrap_or(0);

    descriptors
        .iter()
        .enumerate()
        .map(|(index, descriptor)| {
            format!(
                "{:>2}. {:<id_width$}  {:<6}  {}",
                index + 1,
                descriptor.id.as_str(),
                descriptor.mode.as_str(),
                descriptor.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
