use std::env;

use anyhow::{Context, Result};
use request_number::{NumberProvider, NumberRequest, ProviderConfig, TwilioClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_number=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&args[0]);
        return Ok(());
    }
    if args.len() > 3 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let config = ProviderConfig::from_env().context("Failed to read configuration")?;
    // Unlike the server, the CLI has nothing useful to do without credentials
    config.require_credentials()?;

    let request = NumberRequest {
        area_code: args.get(1).cloned(),
        country: None,
        friendly_name: args.get(2).cloned(),
    };

    let client = TwilioClient::new(config).context("Failed to initialize Twilio client")?;

    println!("Requesting a new phone number...");
    let number = client
        .acquire_number(&request)
        .await
        .context("Number request failed")?;

    println!("Phone number: {}", number.phone_number);
    println!("SID: {}", number.sid);
    if let Some(name) = &number.friendly_name {
        println!("Friendly name: {}", name);
    }

    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [area_code] [friendly_name]", program);
    eprintln!("  area_code: three digits (default: TWILIO_DEFAULT_AREA_CODE or any local number)");
    eprintln!("  friendly_name: label stored with the number");
    eprintln!("Requires TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN.");
}
