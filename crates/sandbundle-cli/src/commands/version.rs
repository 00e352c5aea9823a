use miette::{IntoDiagnostic, Result};
use sandbundle_core::VERSION;

pub fn run(json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({ "name": "sandbundle", "version": VERSION });
        println!("{}", serde_json::to_string(&value).into_diagnostic()?);
    } else {
        println!("sandbundle {VERSION}");
    }
    Ok(())
}
