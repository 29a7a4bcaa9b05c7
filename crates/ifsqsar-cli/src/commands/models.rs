use super::load_registry;
use crate::cli::ModelsArgs;
use crate::error::Result;
use ifsqsar::core::models::{ModelDescriptor, ModelGroup};
use ifsqsar::engine::resolver::validate_registry;
use std::fmt::Write;
use tracing::info;

pub fn run(args: ModelsArgs) -> Result<()> {
    let registry = load_registry(args.reference_data.as_deref())?;
    validate_registry(&registry)?;

    let group = match &args.group {
        Some(name) => name.parse::<ModelGroup>()?,
        None => ModelGroup::All,
    };
    let models = registry.list_by_tag(group);
    info!(group = %group, models = models.len(), "Listing models.");

    print!("{}", format_listing(&models));
    Ok(())
}

fn format_listing(models: &[&ModelDescriptor]) -> String {
    let width = models
        .iter()
        .map(|m| m.name().len())
        .max()
        .unwrap_or(0)
        .max("model".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:<7}  {:<7}  {:<9}  endpoint", "model", "version", "kind", "units");
    for model in models {
        let kind = if model.is_mixture() { "mixture" } else { "pure" };
        let marker = if model.in_default_group() { "*" } else { "" };
        let _ = writeln!(
            out,
            "{:<width$}  {:<7}  {:<7}  {:<9}  {}{}",
            model.name(),
            model.version(),
            kind,
            model.units(),
            model.endpoint(),
            marker,
        );
    }
    out
}
