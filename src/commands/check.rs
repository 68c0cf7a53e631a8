//! Check command implementation.
//!
//! Validates counter sources, platform capabilities and configuration.

use unostat::config::validate_effective_config;
use unostat::platform::IoWaitSupport;
use unostat::{Capabilities, Config, CounterSource, ProcfsSource};

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 unostat - System Check");
    println!("=========================");

    let source = ProcfsSource::new();
    let mut all_ok = true;

    println!("\n🖥️  Platform...");
    let caps = Capabilities::current();
    println!("   ✅ Running on {}", caps.os);
    match caps.iowait {
        IoWaitSupport::Native => println!("   ✅ CPU iowait available"),
        IoWaitSupport::ZeroMeansUnavailable => {
            println!("   ⚠️  CPU iowait may read zero; zero is recorded as N/A")
        }
        IoWaitSupport::Unavailable => println!("   ⚠️  CPU iowait not available (N/A)"),
    }
    if caps.disk_busy_fallback {
        println!("   ⚠️  Disk busy time estimated from read + write time");
    }

    println!("\n📁 Checking counter sources under {}...", source.root().display());
    match source.cpu_times() {
        Ok(_) => println!("   ✅ CPU counters readable"),
        Err(e) => {
            println!("   ❌ CPU counters: {}", e);
            all_ok = false;
        }
    }
    match source.memory().and_then(|m| m.utilization()) {
        Ok(pct) => println!("   ✅ Memory counters readable ({:.1}% used)", pct),
        Err(e) => {
            println!("   ❌ Memory counters: {}", e);
            all_ok = false;
        }
    }
    match source.disk_counters() {
        Ok(disks) => println!("   ✅ Disk counters readable ({} devices)", disks.len()),
        Err(e) => println!("   ⚠️  Disk counters: {} (disk columns will be empty)", e),
    }
    match source.net_counters() {
        Ok(nets) => println!("   ✅ Network counters readable ({} interfaces)", nets.len()),
        Err(e) => println!("   ⚠️  Network counters: {} (network columns will be empty)", e),
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
            println!("   📄 Output: {}", config.output_path().display());
            println!("   🕒 Timezone: {}", config.timezone());
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
