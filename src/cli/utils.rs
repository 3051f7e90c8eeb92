use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::gateway::Payload;
use crate::router::Navigation;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    status: Option<u16>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(status) = status {
                response["status"] = json!(status);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => match status {
            Some(status) => eprintln!("Error ({}): {}", status, message),
            None => eprintln!("Error: {}", message),
        },
    }
    Ok(())
}

/// Output a decoded response payload
pub fn output_payload(output_format: &OutputFormat, payload: Payload) -> anyhow::Result<()> {
    match (output_format, payload) {
        (_, Payload::Empty) => {
            if let OutputFormat::Json = output_format {
                println!("null");
            }
        }
        (_, Payload::Json(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
        (OutputFormat::Json, Payload::Text(text)) => println!("{}", json!(text)),
        (OutputFormat::Text, Payload::Text(text)) => println!("{}", text),
        (OutputFormat::Json, Payload::Binary(bytes)) => {
            println!("{}", json!({ "binary_bytes": bytes.len() }))
        }
        (OutputFormat::Text, Payload::Binary(bytes)) => {
            println!("<{} bytes of binary content>", bytes.len())
        }
    }
    Ok(())
}

/// Output a rendered navigation: shell chrome first, then the page
pub fn output_navigation(output_format: &OutputFormat, navigation: &Navigation) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(navigation)?);
        }
        OutputFormat::Text => {
            if let Some(identity) = &navigation.identity {
                println!("Signed in as {}", identity);
            }
            for entry in &navigation.nav {
                let marker = if entry.active { '*' } else { ' ' };
                println!("{} {:<22} {}", marker, entry.label, entry.href);
            }
            println!();
            println!("[{}] {}", navigation.route, navigation.title);
            if navigation.redirected {
                println!("(redirected to sign in)");
            }
            println!("{}", navigation.markup);
            if let Some(error) = &navigation.mount_error {
                eprintln!("Page failed to load: {}", error);
            }
        }
    }
    Ok(())
}
