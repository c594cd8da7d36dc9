/**
 * Outlet Control Example
 *
 * Switches an outlet on, reads its status, then switches it off again.
 * Device details come from DEVICE_ID, DEVICE_ADDRESS and DEVICE_KEY.
 */
use smartoutlet::Device;
use std::env;
use tokio::time::{Duration, sleep};

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("--- Smartoutlet - Outlet Control ---");

    let id = env::var("DEVICE_ID").unwrap_or_default();
    let address = env::var("DEVICE_ADDRESS").unwrap_or_default();
    let key = env::var("DEVICE_KEY").unwrap_or_default();

    let device = match Device::new(id, address, key) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[ERROR] Invalid device configuration: {}", e);
            return;
        }
    };

    println!("[STEP 1] Switching ON...");
    if let Err(e) = device.turn_on(1).await {
        eprintln!("[ERROR] Control failed ({}): {}", e.code(), e);
    }

    sleep(Duration::from_secs(1)).await;

    println!("[STEP 2] Querying current status...");
    match device.status().await {
        Ok(status) => println!(
            "[SUCCESS] Status: {}",
            serde_json::to_string(&status).unwrap_or_default()
        ),
        Err(e) => eprintln!("[ERROR] Status query failed ({}): {}", e.code(), e),
    }

    println!("[STEP 3] Switching OFF...");
    if let Err(e) = device.turn_off(1).await {
        eprintln!("[ERROR] Control failed ({}): {}", e.code(), e);
    }

    println!("[INFO] Example finished.");
}
