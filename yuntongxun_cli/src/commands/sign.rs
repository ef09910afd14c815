use anyhow::Result;
use yuntongxun_api::Client;

use crate::output::{print_signature, OutputFormat};

pub fn run(client: &Client, format: &OutputFormat) -> Result<()> {
    print_signature(&client.sign(), format)
}
