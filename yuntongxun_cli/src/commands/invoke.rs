use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use yuntongxun_api::{AuthType, Client, Element, Request};

use crate::output::{print_response, OutputFormat};

#[derive(Args)]
pub struct InvokeArgs {
    /// Business function, e.g. SMS, ivr, Calls
    pub function: String,

    /// Operation within the function, e.g. TemplateSMS
    pub action: String,

    /// Authentication level: Accounts or SubAccounts
    #[arg(long)]
    pub auth_type: Option<String>,

    /// URL parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Extra request header as name=value (repeatable)
    #[arg(long = "header", value_parser = parse_key_val)]
    pub headers: Vec<(String, String)>,

    /// JSON object to POST
    #[arg(long, conflicts_with = "xml_file")]
    pub json: Option<String>,

    /// File holding an XML document to POST
    #[arg(long)]
    pub xml_file: Option<PathBuf>,

    /// Timeout in seconds for this call
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn run(args: &InvokeArgs, client: &Client, format: &OutputFormat) -> Result<()> {
    let client = match &args.auth_type {
        Some(auth_type) => client.clone().with_auth_type(auth_type.parse::<AuthType>()?),
        None => client.clone(),
    };
    let request = build_request(args)?;

    tracing::info!(
        "Invoking {}/{} as {}",
        request.function(),
        request.action(),
        client.auth_type()
    );
    let response = client.invoke(&request).await?;
    print_response(&response, format)
}

fn build_request(args: &InvokeArgs) -> Result<Request> {
    let mut request = Request::new(&args.function, &args.action);
    for (key, value) in &args.params {
        request = request.with_query_param(key, value);
    }
    for (name, value) in &args.headers {
        request = request.with_header(name, value);
    }
    if let Some(secs) = args.timeout {
        if secs == 0 {
            bail!("--timeout must be at least one second");
        }
        request = request.with_timeout(Duration::from_secs(secs));
    }

    if let Some(raw) = &args.json {
        let body: serde_json::Value =
            serde_json::from_str(raw).context("--json is not valid JSON")?;
        if !body.is_object() {
            bail!("--json must be a JSON object");
        }
        request = request.with_json_body(body);
    } else if let Some(path) = &args.xml_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let document = Element::parse(&text)
            .with_context(|| format!("{} is not a valid XML document", path.display()))?;
        request = request.with_xml_body(document);
    }
    Ok(request)
}

pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    if key.is_empty() {
        return Err(format!("empty key in {:?}", s));
    }
    Ok((key.to_string(), value.to_string()))
}
