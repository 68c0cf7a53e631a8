//! List-devices command implementation.
//!
//! Prints the disk and network names the filters can refer to.

use unostat::collector::is_loopback;
use unostat::{CounterSource, ProcfsSource};

/// Lists disks and network interfaces with their cumulative counters.
pub fn command_list_devices() -> anyhow::Result<()> {
    let source = ProcfsSource::new();
    print_devices(&source)
}

fn print_devices(source: &dyn CounterSource) -> anyhow::Result<()> {
    println!("💾 Disk devices");
    println!("===============");
    match source.disk_counters() {
        Ok(disks) if disks.is_empty() => println!("   (none)"),
        Ok(disks) => {
            for (name, c) in &disks {
                println!(
                    "   /dev/{:<16} reads={:<12} writes={:<12} busy={}ms",
                    name, c.read_count, c.write_count, c.busy_time_ms
                );
            }
        }
        Err(e) => println!("   ❌ Cannot read disk counters: {}", e),
    }

    println!("\n🌐 Network interfaces");
    println!("=====================");
    match source.net_counters() {
        Ok(nets) if nets.is_empty() => println!("   (none)"),
        Ok(nets) => {
            for (name, c) in &nets {
                let note = if is_loopback(name) { " (loopback, not recorded)" } else { "" };
                println!(
                    "   {:<21} rx={:<14} tx={}{}",
                    name, c.bytes_recv, c.bytes_sent, note
                );
            }
        }
        Err(e) => println!("   ❌ Cannot read network counters: {}", e),
    }

    println!("\nUse these names with --include-disks/--exclude-disks and");
    println!("--include-networks/--exclude-networks (the /dev/ prefix is optional).");
    Ok(())
}
