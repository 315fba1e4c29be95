use anyhow::Result;

/// Dump the generated OpenAPI document as JSON.
fn main() -> Result<()> {
    let spec = akonto::api::openapi();
    println!("{}", spec.to_pretty_json()?);
    Ok(())
}
