//! Client commands: one provider operation against an address.

use std::time::Duration;

use vab::{ElementProxy, ModelProvider, Value};

use crate::cli::{ClientArgs, InvokeArgs, TargetArgs, ValueArgs};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn connect(args: &ClientArgs) -> vab::Result<ElementProxy> {
    let resolver = super::network_resolver(Duration::from_secs(args.timeout))?;
    resolver.resolve(&args.address)
}

fn parse_value(text: &str) -> vab::Result<Value> {
    Value::from_json_str(text)
}

/// Run the read command, printing the value as JSON
pub async fn read(args: &TargetArgs) -> CommandResult {
    let value = connect(&args.client)?.read("").await?;
    println!("{}", value.to_json_string());
    Ok(())
}

pub async fn write(args: &ValueArgs) -> CommandResult {
    let value = parse_value(&args.value)?;
    connect(&args.client)?.write("", value).await?;
    Ok(())
}

pub async fn create(args: &ValueArgs) -> CommandResult {
    let value = parse_value(&args.value)?;
    connect(&args.client)?.create("", value).await?;
    Ok(())
}

pub async fn delete(args: &TargetArgs) -> CommandResult {
    connect(&args.client)?.delete("").await?;
    Ok(())
}

pub async fn delete_member(args: &ValueArgs) -> CommandResult {
    let value = parse_value(&args.value)?;
    connect(&args.client)?.delete_member("", value).await?;
    Ok(())
}

/// Run the invoke command, printing the result as JSON
pub async fn invoke(args: &InvokeArgs) -> CommandResult {
    let values = args
        .args
        .iter()
        .map(|text| parse_value(text))
        .collect::<vab::Result<Vec<_>>>()?;
    let result = connect(&args.client)?.invoke("", values).await?;
    println!("{}", result.to_json_string());
    Ok(())
}
