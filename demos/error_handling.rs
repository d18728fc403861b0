//! Example demonstrating how Alma failures surface as typed errors.
//!
//! This example shows how to:
//! - Build a client from `ALMA_*` environment variables
//! - Tell gateway, logical and server errors apart
//! - Read Alma's error code and message
//! - Check the remaining daily quota
//!
//! Run with: `ALMA_API_KEY=... cargo run --example error_handling`

use alma_api::{Client, Configuration, Error, ErrorKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("alma_api=debug,error_handling=info")
        .init();

    let client = Client::new(Configuration::from_env()?)?;

    println!("=== Example 1: Unknown user ===");
    match client.get("/users/no-such-user-4711", &[]).await {
        Ok(response) => println!("Unexpectedly found: {:?}", response.json()),
        Err(Error::Logical {
            message,
            code,
            status,
        }) => {
            println!("Logical error!");
            println!("  Status: {}", status);
            println!("  Alma code: {}", code);
            println!("  Message: {}", message);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Gateway rejection ===");
    let bad_key = Client::configure(|config| config.api_key("not-a-real-key"))?;
    match bad_key.get("/conf/test", &[]).await {
        Ok(_) => println!("The gateway accepted a bogus key?"),
        Err(e) if e.kind() == ErrorKind::Gateway => {
            println!("Gateway error {}: {}", e.code(), e.message());
        }
        Err(e) => println!("Other error ({:?}): {}", e.kind(), e),
    }
    println!();

    println!("=== Example 3: Remaining API calls ===");
    let remaining = client.remaining_api_calls().await;
    if remaining < 0 {
        println!("Quota unknown");
    } else {
        println!("{} calls left today", remaining);
    }

    Ok(())
}
