use netgrid_core::OperatorSettings;

pub fn print(settings: &OperatorSettings) -> anyhow::Result<()> {
    print!("{}", settings.to_toml_string()?);
    Ok(())
}
