//! `momo memory`: inspect or clear long-term memory.

use momo_config::AppConfig;
use momo_core::clock::SystemClock;
use momo_memory::{DecayCurve, MemoryStore};
use std::sync::Arc;

fn open(config: &AppConfig) -> MemoryStore {
    MemoryStore::load(
        &config.memory_path(),
        config.memory.capacity,
        DecayCurve::with_half_life_days(config.memory.half_life_days),
        Arc::new(SystemClock),
    )
}

pub fn list(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let mut store = open(&config);

    if store.is_empty() {
        println!("Nothing remembered yet.");
        return Ok(());
    }

    println!(
        "{} memories in {} (showing up to {limit}):",
        store.len(),
        config.memory_path().display()
    );
    for (i, item) in store.top_k(limit).iter().enumerate() {
        println!(
            "  [{i}] {:.3}  {}  {}",
            item.current_importance(),
            item.time().format("%Y-%m-%d %H:%M"),
            item.message()
        );
    }
    Ok(())
}

pub fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let path = config.memory_path();
    let mut store = open(&config);
    let forgotten = store.len();

    store.clear();
    store.save(&path)?;
    println!("Forgot {forgotten} memories.");
    Ok(())
}
