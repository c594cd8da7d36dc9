/**
 * Outlet Timer Example (Blocking)
 *
 * Uses the synchronous wrapper to start the outlet's countdown timer.
 * Set TIMER_DPS to pin the timer index instead of guessing it from status.
 */
use smartoutlet::sync::Device;
use smartoutlet::{DeviceBuilder, TimerSlot};
use std::env;

fn main() {
    env_logger::init();
    println!("--- Smartoutlet - Timer (Sync) ---");

    let id = env::var("DEVICE_ID").unwrap_or_default();
    let address = env::var("DEVICE_ADDRESS").unwrap_or_default();
    let key = env::var("DEVICE_KEY").unwrap_or_default();
    let seconds: u64 = env::var("TIMER_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let mut builder = DeviceBuilder::new(id, key).address(address);
    if let Ok(index) = env::var("TIMER_DPS") {
        builder = builder.timer_slot(TimerSlot::Fixed(index));
    }

    let device = match Device::from_builder(builder) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[ERROR] Invalid device configuration: {}", e);
            return;
        }
    };

    println!("[INFO] Starting a {}s timer...", seconds);
    match device.set_timer(seconds) {
        Ok(reply) => println!("[SUCCESS] Reply: {}", hex::encode(reply)),
        Err(e) => eprintln!("[ERROR] Timer failed ({}): {}", e.code(), e),
    }
}
