//! # CardPOS Register Entry Point
//!
//! ## Usage
//! ```bash
//! register                          # config from the platform config dir
//! register --config ./register.toml
//! RUST_LOG=debug register
//! ```

use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("--config requires a path");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("CardPOS register");
                println!();
                println!("Usage: register [--config <path>]");
                println!();
                println!("Environment:");
                println!("  CARDPOS_DB_PATH                  database file");
                println!("  CARDPOS_STORE_NAME               name printed on receipts");
                println!("  CARDPOS_CURRENCY_SYMBOL          amount prefix, e.g. \"S/ \"");
                println!("  CARDPOS_SELLER_DISCOUNT_CEILING  max seller discount in %");
                println!("  RUST_LOG                         log filter");
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }

    if let Err(e) = cardpos_register::run(config_path.as_deref()).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
