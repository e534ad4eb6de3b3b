use anyhow::Result;

// Print the OpenAPI document so clients can be generated without a running server
fn main() -> Result<()> {
    let spec = tollgate::api::openapi();
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
